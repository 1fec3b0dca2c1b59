//! HTTP listener configuration.

use std::net::SocketAddr;

use stockroom_infra::ConfigError;
use stockroom_infra::config::parse_var;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
}

impl ApiConfig {
    /// Read `STOCKROOM_BIND_ADDR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup("STOCKROOM_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        Ok(Self {
            bind_addr: parse_var("STOCKROOM_BIND_ADDR", &raw)?,
        })
    }
}
