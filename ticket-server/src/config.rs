//! Server configuration

use std::str::FromStr;
use std::time::Duration;

use crate::db::BoxError;

/// Server configuration, built once from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT secret for user authentication
    pub jwt_secret: String,
    pub db_max_connections: u32,
    /// Max sort-order writes in flight per reorder batch
    pub reorder_fanout_limit: usize,
    /// Deadline for one reorder transaction
    pub reorder_timeout: Duration,
    /// Deadline for one HTTP request
    pub request_timeout: Duration,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: env_or("HTTP_PORT", 8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            environment,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            reorder_fanout_limit: env_or("REORDER_FANOUT_LIMIT", 8usize).max(1),
            reorder_timeout: Duration::from_secs(env_or("REORDER_TIMEOUT_SECS", 10)),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 30)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_required_outside_development() {
        let name = "TICKET_SERVER_TEST_UNSET_SECRET";
        assert!(Config::require_secret(name, "production").is_err());
        let dev = Config::require_secret(name, "development").unwrap();
        assert!(dev.starts_with("dev-"));
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        assert_eq!(env_or("TICKET_SERVER_TEST_UNSET_PORT", 8080u16), 8080);
    }
}
