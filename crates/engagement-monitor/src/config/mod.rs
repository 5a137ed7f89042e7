use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::engagement::access::{Identity, Role};
use crate::engagement::domain::EmployeeId;
use crate::engagement::scoring::{
    RiskPolicy, ScoringConfig, DEFAULT_DECAY_POINTS_PER_MONTH, DEFAULT_INITIAL_SCORE,
    DEFAULT_PRIOR_SCORE,
};
use crate::engagement::service::{EngagementConfig, DEFAULT_ROSTER_LIMIT};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engagement: EngagementConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let risk_policy = match non_empty_var("ENGAGEMENT_RISK_POLICY") {
            Some(raw) => RiskPolicy::parse(&raw).ok_or(ConfigError::InvalidRiskPolicy(raw))?,
            None => RiskPolicy::default(),
        };
        let scoring = ScoringConfig {
            risk_policy,
            decay_points_per_month: number_var(
                "ENGAGEMENT_DECAY_POINTS",
                DEFAULT_DECAY_POINTS_PER_MONTH,
                100,
            )?,
            default_prior_score: number_var("ENGAGEMENT_DEFAULT_PRIOR", DEFAULT_PRIOR_SCORE, 100)?,
            initial_score: number_var("ENGAGEMENT_INITIAL_SCORE", DEFAULT_INITIAL_SCORE, 100)?,
        };
        let roster_limit = number_var("ENGAGEMENT_ROSTER_LIMIT", DEFAULT_ROSTER_LIMIT, 1_000)?;

        let identities = match non_empty_var("APP_IDENTITIES") {
            Some(raw) => parse_identities(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engagement: EngagementConfig {
                scoring,
                roster_limit,
            },
            auth: AuthConfig {
                cron_secret: non_empty_var("CRON_SECRET"),
                identities,
            },
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn number_var<T>(name: &'static str, default: T, max: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + fmt::Display,
{
    let Some(raw) = non_empty_var(name) else {
        return Ok(default);
    };

    let value = raw.parse::<T>().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: raw.clone(),
    })?;
    if value > max {
        return Err(ConfigError::OutOfRange {
            name,
            max: max.to_string(),
        });
    }
    Ok(value)
}

/// Parses `token:role[:employee_id]` entries separated by `;`.
pub fn parse_identities(raw: &str) -> Result<Vec<IdentityEntry>, ConfigError> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.split(':').map(str::trim);
            let token = parts.next().filter(|token| !token.is_empty());
            let role = parts.next().and_then(Role::parse);
            let employee_id = parts
                .next()
                .filter(|id| !id.is_empty())
                .map(|id| EmployeeId(id.to_string()));

            match (token, role, parts.next()) {
                (Some(token), Some(role), None) => Ok(IdentityEntry {
                    token: token.to_string(),
                    identity: Identity { role, employee_id },
                }),
                _ => Err(ConfigError::InvalidIdentity(entry.to_string())),
            }
        })
        .collect()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Credentials accepted at the HTTP boundary.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Shared secret for the scheduled decay job. The job endpoint is disabled when unset.
    pub cron_secret: Option<String>,
    pub identities: Vec<IdentityEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityEntry {
    pub token: String,
    pub identity: Identity,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRiskPolicy(String),
    InvalidNumber { name: &'static str, value: String },
    OutOfRange { name: &'static str, max: String },
    InvalidIdentity(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRiskPolicy(value) => write!(
                f,
                "ENGAGEMENT_RISK_POLICY must be 'standard' or 'strict', got '{value}'"
            ),
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a non-negative integer, got '{value}'")
            }
            ConfigError::OutOfRange { name, max } => write!(f, "{name} must not exceed {max}"),
            ConfigError::InvalidIdentity(entry) => write!(
                f,
                "APP_IDENTITIES entry '{entry}' must look like token:role[:employee_id]"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "ENGAGEMENT_RISK_POLICY",
            "ENGAGEMENT_DECAY_POINTS",
            "ENGAGEMENT_DEFAULT_PRIOR",
            "ENGAGEMENT_INITIAL_SCORE",
            "ENGAGEMENT_ROSTER_LIMIT",
            "CRON_SECRET",
            "APP_IDENTITIES",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.engagement, EngagementConfig::default());
        assert!(config.auth.cron_secret.is_none());
        assert!(config.auth.identities.is_empty());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_engagement_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ENGAGEMENT_RISK_POLICY", "strict");
        env::set_var("ENGAGEMENT_DECAY_POINTS", "3");
        env::set_var("ENGAGEMENT_ROSTER_LIMIT", "25");
        env::set_var("CRON_SECRET", "s3cret");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.engagement.scoring.risk_policy, RiskPolicy::Strict);
        assert_eq!(config.engagement.scoring.decay_points_per_month, 3);
        assert_eq!(config.engagement.roster_limit, 25);
        assert_eq!(config.auth.cron_secret.as_deref(), Some("s3cret"));
        reset_env();
    }

    #[test]
    fn rejects_invalid_engagement_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ENGAGEMENT_RISK_POLICY", "lenient");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidRiskPolicy(_))
        ));

        reset_env();
        env::set_var("ENGAGEMENT_INITIAL_SCORE", "120");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::OutOfRange {
                name: "ENGAGEMENT_INITIAL_SCORE",
                ..
            })
        ));

        reset_env();
        env::set_var("ENGAGEMENT_DECAY_POINTS", "two");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber { .. })
        ));
        reset_env();
    }

    #[test]
    fn parses_identity_entries() {
        let entries =
            parse_identities("hr-token:hr; emp-token:employee:emp-000001 ;").expect("parses");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].token, "hr-token");
        assert_eq!(entries[0].identity.role, Role::Hr);
        assert!(entries[0].identity.employee_id.is_none());
        assert_eq!(
            entries[1].identity.employee_id,
            Some(EmployeeId("emp-000001".to_string()))
        );

        assert!(matches!(
            parse_identities("broken"),
            Err(ConfigError::InvalidIdentity(_))
        ));
        assert!(matches!(
            parse_identities("t:admin"),
            Err(ConfigError::InvalidIdentity(_))
        ));
    }
}
