//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::channels::DEFAULT_API_BASE;
use crate::error::ConfigError;
use crate::watch::{BudgetPolicy, WatcherConfig};

/// Directory database used when `RELAY_DB_PATH` is unset.
pub const DEFAULT_DB_PATH: &str = "./data/gag-relay.db";

/// Relay configuration, built once from environment variables at startup.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bot credential (`TELEGRAM_BOT_TOKEN`).
    pub bot_token: SecretString,
    /// The bot's own numeric id (`TELEGRAM_BOT_ID`); 0 when unknown.
    pub bot_id: i64,
    /// Bot API base URL (`TELEGRAM_API_BASE`).
    pub api_base: String,
    pub poll_interval: Duration,
    /// Timeout for each poll and delivery request.
    pub http_timeout: Duration,
    pub probe_timeout: Duration,
    /// Bad poll responses tolerated before the watcher stops. Always > 0.
    pub error_limit: u16,
    pub budget_policy: BudgetPolicy,
    /// Upper bound on concurrent delivery requests. Always > 0.
    pub max_concurrent_deliveries: usize,
    /// libSQL file backing the recipient directory.
    pub db_path: PathBuf,
    /// Directory for a daily rolling log file, if any.
    pub log_dir: Option<PathBuf>,
}

impl RelayConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()))?;

        let error_limit: u16 = parse_or(&lookup, "RELAY_ERROR_LIMIT", 10)?;
        if error_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RELAY_ERROR_LIMIT".into(),
                message: "must be greater than 0".into(),
            });
        }

        let max_concurrent_deliveries: usize =
            parse_or(&lookup, "RELAY_MAX_CONCURRENT_DELIVERIES", 32)?;
        if max_concurrent_deliveries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RELAY_MAX_CONCURRENT_DELIVERIES".into(),
                message: "must be greater than 0".into(),
            });
        }

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            bot_id: parse_or(&lookup, "TELEGRAM_BOT_ID", 0)?,
            api_base: lookup("TELEGRAM_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            poll_interval: parse_secs(&lookup, "RELAY_POLL_INTERVAL_SECS", 30)?,
            http_timeout: parse_secs(&lookup, "RELAY_HTTP_TIMEOUT_SECS", 30)?,
            probe_timeout: parse_secs(&lookup, "RELAY_PROBE_TIMEOUT_SECS", 15)?,
            error_limit,
            budget_policy: parse_or(&lookup, "RELAY_ERROR_BUDGET_POLICY", BudgetPolicy::Lifetime)?,
            max_concurrent_deliveries,
            db_path: lookup("RELAY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            log_dir: lookup("RELAY_LOG_DIR").map(PathBuf::from),
        })
    }

    /// Watcher settings derived from this config.
    pub fn watcher(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval: self.poll_interval,
            error_limit: self.error_limit,
            budget_policy: self.budget_policy,
            bot_id: self.bot_id,
            ..WatcherConfig::default()
        }
    }
}

/// Parse `key` if set, otherwise fall back to `default`.
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
        None => Ok(default),
    }
}

/// Parse a whole number of seconds; zero is rejected.
fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, key, default)? {
        0 => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be at least 1 second".into(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}
