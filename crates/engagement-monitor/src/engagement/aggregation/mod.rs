mod breakdown;
mod summary;
mod trend;
pub mod views;

pub use breakdown::compute_breakdown;
pub use summary::{company_stats, rank_roster, EmployeeStanding, NO_DATA_LABEL};
pub use trend::{compute_trend, period_start, ScoreSample};
pub use views::{CompanyStats, QuestionAverage, RosterEntry, TrendGranularity, TrendPoint};
