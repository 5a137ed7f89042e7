pub mod config;
pub mod engagement;
pub mod error;
pub mod import;
pub mod telemetry;
