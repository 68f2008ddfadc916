//! Cache entry type

use std::time::{Duration, Instant};

/// A stored value with its expiry bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,
    /// When the entry was written
    pub created_at: Instant,
    /// Time-to-live; `None` never expires
    pub ttl: Option<Duration>,
    /// Size of the value in bytes
    pub size: usize,
}

impl<T> CacheEntry<T> {
    /// Create a new cache entry without expiry
    pub fn new(value: T, size: usize) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl: None,
            size,
        }
    }

    /// Create entry with TTL
    pub fn with_ttl(value: T, size: usize, ttl: Duration) -> Self {
        let mut entry = Self::new(value, size);
        entry.ttl = Some(ttl);
        entry
    }

    /// Check if entry has expired
    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.created_at.elapsed() >= ttl,
            None => false,
        }
    }

    /// Point in time at which the entry expires
    pub fn expires_at(&self) -> Option<Instant> {
        self.ttl.map(|ttl| self.created_at + ttl)
    }
}
