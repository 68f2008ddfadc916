//! In-memory cache backend using DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use survey_cache_core::{CacheBackend, CacheEntry, CacheOptions, CacheStats, Result};

use crate::pattern::{glob_match, validate_pattern};

/// Configuration for the memory backend
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum number of entries (0 = unlimited)
    pub max_entries: usize,
    /// How often the background sweep drops expired entries
    pub check_period: Duration,
    /// TTL for writes that don't carry one (`None` = never expire)
    pub default_ttl: Option<Duration>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            check_period: Duration::from_secs(60),
            default_ttl: None,
        }
    }
}

impl MemoryConfig {
    /// Create config with specific capacity
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Default::default()
        }
    }

    /// Set the expiry sweep period
    pub fn check_period(mut self, period: Duration) -> Self {
        self.check_period = period;
        self
    }

    /// Set the TTL used when a write has none
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }
}

#[derive(Debug, Default)]
struct MemoryStats {
    hits: u64,
    misses: u64,
    writes: u64,
    deletes: u64,
    evictions: u64,
}

struct Inner {
    data: DashMap<String, CacheEntry<Vec<u8>>>,
    stats: RwLock<MemoryStats>,
}

impl Inner {
    fn remove_expired(&self) -> usize {
        let expired: Vec<String> = self
            .data
            .iter()
            .filter(|entry| entry.is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        let mut count = 0;
        for key in expired {
            // Re-check under the shard lock; the key may have been rewritten
            if self.data.remove_if(&key, |_, e| e.is_expired()).is_some() {
                count += 1;
            }
        }
        if count > 0 {
            self.stats.write().evictions += count as u64;
        }
        count
    }
}

/// Process-local cache tier
///
/// Cloning creates a new handle to the SAME underlying store.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
    config: MemoryConfig,
}

impl MemoryBackend {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                data: DashMap::with_capacity(config.max_entries.min(10_000)),
                stats: RwLock::new(MemoryStats::default()),
            }),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(MemoryConfig::default())
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Drop expired entries now; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        self.inner.remove_expired()
    }

    /// Start the periodic expiry sweep
    ///
    /// The task stops on its own once every handle to this store is dropped.
    /// Must be called from within a Tokio runtime.
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let period = self.config.check_period.max(Duration::from_millis(10));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let removed = inner.remove_expired();
                if removed > 0 {
                    debug!(target: "survey_cache", removed, "Swept expired local entries");
                }
            }
        })
    }

    /// Get approximate memory usage
    pub fn memory_usage(&self) -> usize {
        self.inner
            .data
            .iter()
            .map(|entry| entry.size + entry.key().len())
            .sum()
    }

    /// Make room for `key` if the store is full
    ///
    /// Expired entries go first; after that the entry closest to expiry
    /// (entries without a TTL last, oldest first among them).
    fn make_room_for(&self, key: &str) {
        let max = self.config.max_entries;
        if max == 0 || self.inner.data.contains_key(key) || self.inner.data.len() < max {
            return;
        }

        self.inner.remove_expired();

        while self.inner.data.len() >= max {
            let victim = self
                .inner
                .data
                .iter()
                .min_by_key(|entry| {
                    let expires = entry.expires_at();
                    (expires.is_none(), expires.unwrap_or(entry.created_at))
                })
                .map(|entry| entry.key().clone());

            match victim {
                Some(victim) => {
                    self.inner.data.remove(&victim);
                    self.inner.stats.write().evictions += 1;
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry<Vec<u8>>>> {
        let found = self.inner.data.get(key).map(|entry| entry.clone());

        match found {
            Some(entry) if entry.is_expired() => {
                self.inner.data.remove_if(key, |_, e| e.is_expired());
                let mut stats = self.inner.stats.write();
                stats.misses += 1;
                stats.evictions += 1;
                Ok(None)
            }
            Some(entry) => {
                self.inner.stats.write().hits += 1;
                Ok(Some(entry))
            }
            None => {
                self.inner.stats.write().misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: &CacheOptions) -> Result<()> {
        self.make_room_for(key);

        let size = value.len();
        let entry = match options.ttl.or(self.config.default_ttl) {
            Some(ttl) => CacheEntry::with_ttl(value, size, ttl),
            None => CacheEntry::new(value, size),
        };

        self.inner.data.insert(key.to_string(), entry);
        self.inner.stats.write().writes += 1;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        match self.inner.data.remove(key) {
            Some(_) => {
                self.inner.stats.write().deletes += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_many(&self, keys: &[&str]) -> Result<u64> {
        let mut count = 0;
        for key in keys {
            if self.delete(key).await? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        validate_pattern(pattern)?;

        let matching: Vec<String> = self
            .inner
            .data
            .iter()
            .filter(|entry| glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut count = 0;
        for key in matching {
            if self.inner.data.remove(&key).is_some() {
                count += 1;
            }
        }
        self.inner.stats.write().deletes += count;
        Ok(count)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self
            .inner
            .data
            .get(key)
            .is_some_and(|entry| !entry.is_expired()))
    }

    async fn clear(&self) -> Result<()> {
        self.inner.data.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let stats = self.inner.stats.read();
        Ok(CacheStats {
            hits: stats.hits,
            misses: stats.misses,
            writes: stats.writes,
            deletes: stats.deletes,
            evictions: stats.evictions,
            size: self.inner.data.len(),
            memory_bytes: self.memory_usage(),
        })
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.data.len())
    }
}
