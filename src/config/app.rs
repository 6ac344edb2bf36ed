//! Environment-driven configuration.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: Postgres URL for the data store backing `unique` (optional)
//! - `REDIS_URL`: Redis URL for the session store (optional)
//! - `SESSION_TTL_SECS`: lifetime of persisted session values (default: 3600, 0 disables expiry)
//! - `VALIDATOR_STRICT_RULES`: `true` to reject unknown rule names instead of skipping them
//! - `LOG_FORMAT`: `text` or `json` (default: `text`)

use std::env;

use crate::constants::DEFAULT_SESSION_TTL_SECS;
use crate::functional::validation_engine::ValidationConfig;
use crate::utils::logger::LogFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub session_ttl_secs: u64,
    pub strict_rules: bool,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            redis_url: None,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            strict_rules: false,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Self {
        if let Err(e) = dotenv::dotenv() {
            log::debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Unparsable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            database_url: non_empty("DATABASE_URL"),
            redis_url: non_empty("REDIS_URL"),
            session_ttl_secs: non_empty("SESSION_TTL_SECS")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(defaults.session_ttl_secs),
            strict_rules: non_empty("VALIDATOR_STRICT_RULES")
                .map(|value| parse_flag(&value))
                .unwrap_or(defaults.strict_rules),
            log_format: non_empty("LOG_FORMAT")
                .and_then(|value| LogFormat::parse(&value))
                .unwrap_or(defaults.log_format),
        }
    }

    pub fn validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            strict_rules: self.strict_rules,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
