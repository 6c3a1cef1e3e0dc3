//! Service configuration read from the environment

use std::time::Duration;

use crate::database::constants::DEFAULT_DB_PATH;
use crate::database::retry::RetryPolicy;
use crate::utils::env_parse;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: String,
    pub db_max_connections: u32,
    pub retry: RetryPolicy,
    /// One rate-limit token is replenished every this many milliseconds
    pub rate_limit_replenish_ms: u64,
    pub rate_limit_burst: u32,
    pub request_body_limit: usize,
    /// `None` allows any origin
    pub cors_allow_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            db_path: DEFAULT_DB_PATH.to_string(),
            db_max_connections: 5,
            retry: RetryPolicy::default(),
            rate_limit_replenish_ms: 50,
            rate_limit_burst: 100,
            request_body_limit: 64 * 1024,
            cors_allow_origin: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: env_parse("PORT", defaults.port),
            db_path: std::env::var("DB_PATH").unwrap_or(defaults.db_path),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            retry: RetryPolicy {
                max_attempts: env_parse("DB_RETRY_ATTEMPTS", defaults.retry.max_attempts),
                base_delay: Duration::from_millis(env_parse(
                    "DB_RETRY_BASE_DELAY_MS",
                    defaults.retry.base_delay.as_millis() as u64,
                )),
            },
            rate_limit_replenish_ms: env_parse("RATE_LIMIT_REPLENISH_MS", defaults.rate_limit_replenish_ms)
                .max(1),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", defaults.rate_limit_burst).max(1),
            request_body_limit: env_parse("REQUEST_BODY_LIMIT", defaults.request_body_limit),
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && v != "*"),
        }
    }

    /// Settings for router tests: in-memory store, no retry delay
    pub fn for_tests() -> Self {
        Self {
            db_path: crate::database::constants::MEMORY_DB_PATH.to_string(),
            retry: RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::ZERO,
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, "townhall.db");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(1000));
        assert_eq!(config.request_body_limit, 65536);
        assert!(config.cors_allow_origin.is_none());
    }
}
