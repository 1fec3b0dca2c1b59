//! Configuration loading and representation.
//!
//! Everything is read from environment variables once at startup. A variable
//! that is set but malformed is an error; an unset variable takes its default.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraConfig {
    /// Postgres URL. `None` selects the in-memory stores.
    pub database_url: Option<String>,
    /// Upper bound of the connection pool.
    pub max_connections: u32,
    /// How long a request waits for a pooled connection.
    pub acquire_timeout: Duration,
    /// Run the idempotent schema bootstrap on startup.
    pub apply_schema: bool,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            apply_schema: false,
        }
    }
}

impl InfraConfig {
    /// Read `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`,
    /// `DATABASE_ACQUIRE_TIMEOUT_SECS` and `STOCKROOM_APPLY_SCHEMA`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`InfraConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => {
                let n: u32 = parse_var("DATABASE_MAX_CONNECTIONS", &raw)?;
                if n == 0 {
                    return Err(invalid("DATABASE_MAX_CONNECTIONS", &raw, "must be at least 1"));
                }
                n
            }
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let acquire_timeout = match lookup("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_var("DATABASE_ACQUIRE_TIMEOUT_SECS", &raw)?),
            None => Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        };

        let apply_schema = match lookup("STOCKROOM_APPLY_SCHEMA") {
            Some(raw) => parse_var("STOCKROOM_APPLY_SCHEMA", &raw)?,
            None => false,
        };

        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout,
            apply_schema,
        })
    }

    pub fn uses_postgres(&self) -> bool {
        self.database_url.is_some()
    }
}

pub fn parse_var<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| invalid(var, raw, &e.to_string()))
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
