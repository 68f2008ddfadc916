//! Per-write cache options

use std::time::Duration;

/// Per-write options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Time-to-live; `None` lets the tier apply its own default
    pub ttl: Option<Duration>,
}

impl From<Duration> for CacheOptions {
    fn from(ttl: Duration) -> Self {
        CacheOptions { ttl: Some(ttl) }
    }
}
