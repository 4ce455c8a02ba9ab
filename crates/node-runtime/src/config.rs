//! # Node Configuration
//!
//! Defaults overridden by environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SC_CHAIN_ID` | `app.chain_id` |
//! | `SC_SHARDS` | `app.executor.shard_count` |
//! | `SC_ASYNC_DELIVERY` | `app.executor.async_delivery` |
//! | `SC_GENESIS` | `genesis_path` |
//! | `SC_BLOCK_INTERVAL_MS` | `block_interval` |
//! | `SC_HISTORY` | `app.query_history_limit` |

use sc_07_block_app::AppConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    InvalidValue {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub app: AppConfig,
    /// Genesis JSON file. A single-validator devnet genesis is generated
    /// when unset.
    pub genesis_path: Option<PathBuf>,
    pub block_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            genesis_path: None,
            block_interval: Duration::from_millis(1_000),
        }
    }
}

impl NodeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(chain_id) = lookup("SC_CHAIN_ID") {
            config.app.chain_id = chain_id;
        }
        if let Some(value) = lookup("SC_SHARDS") {
            config.app.executor.shard_count = parse("SC_SHARDS", "a positive integer", &value)
                .and_then(|n: usize| {
                    if n == 0 {
                        Err(invalid("SC_SHARDS", "a positive integer", &value))
                    } else {
                        Ok(n)
                    }
                })?;
        }
        if let Some(value) = lookup("SC_ASYNC_DELIVERY") {
            config.app.executor.async_delivery = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(invalid("SC_ASYNC_DELIVERY", "a boolean", &value)),
            };
        }
        if let Some(path) = lookup("SC_GENESIS") {
            config.genesis_path = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("SC_BLOCK_INTERVAL_MS") {
            let ms: u64 = parse("SC_BLOCK_INTERVAL_MS", "milliseconds", &value)?;
            config.block_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(value) = lookup("SC_HISTORY") {
            config.app.query_history_limit = Some(parse("SC_HISTORY", "a version count", &value)?);
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, expected: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(var, expected, value))
}

fn invalid(var: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        expected,
        value: value.to_string(),
    }
}
