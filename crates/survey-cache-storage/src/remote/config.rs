//! Configuration for Redis backend

use serde::Deserialize;
use std::time::Duration;

/// Connection and timeout settings for the distributed tier
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,

    /// Connection pool size
    pub pool_size: u32,

    /// How long to wait for a pooled connection
    pub connection_timeout_secs: u64,

    /// Upper bound on a single command, including connection checkout
    pub command_timeout_ms: u64,

    /// Optional prefix prepended to every key; `None` keeps keys exactly as given
    pub key_prefix: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
            connection_timeout_secs: 5,
            command_timeout_ms: 2_000,
            key_prefix: None,
        }
    }
}

impl RedisConfig {
    /// Create new config with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn command_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}
