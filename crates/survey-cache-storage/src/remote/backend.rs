use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use parking_lot::RwLock;
use redis::{AsyncCommands, Value};
use std::future::Future;
use std::sync::Arc;

use survey_cache_core::{CacheBackend, CacheEntry, CacheError, CacheOptions, CacheStats, Result};

use super::config::RedisConfig;

const SCAN_BATCH: usize = 500;

/// Distributed cache tier backed by a Redis connection pool
///
/// Values are stored as the raw serialized bytes under the caller's key
/// (plus the optional prefix), so entries can be inspected with `redis-cli`.
/// Every command runs under the configured command timeout; a timeout is
/// reported as [`CacheError::Timeout`].
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool<RedisConnectionManager>,
    config: RedisConfig,
    stats: Arc<RwLock<CacheStats>>,
}

impl RedisBackend {
    /// Create a backend without contacting the server
    ///
    /// Only a malformed URL fails here; an unreachable server shows up later
    /// as connection errors on individual calls. Must be called from within
    /// a Tokio runtime.
    pub fn new(config: RedisConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout())
            .build_unchecked(manager);

        Ok(Self {
            pool,
            config,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        })
    }

    /// Create a backend and verify the server answers
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        let backend = Self::new(config)?;
        backend.ping().await?;
        Ok(backend)
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    fn prefixed_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    async fn get_connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }

    async fn timed<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.command_timeout_duration(), fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout),
        }
    }

    /// SCAN for keys matching an already-prefixed pattern
    async fn scan(
        conn: &mut PooledConnection<'_, RedisConnectionManager>,
        pattern: &str,
    ) -> Result<Vec<String>> {
        let mut found = Vec::new();
        let mut cursor = 0u64;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut **conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;

            found.extend(keys);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(found)
    }

    async fn unlink_matching(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        let keys = Self::scan(&mut conn, pattern).await?;

        let mut count = 0u64;
        for chunk in keys.chunks(SCAN_BATCH) {
            let removed: u64 = conn
                .unlink(chunk)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            count += removed;
        }
        Ok(count)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry<Vec<u8>>>> {
        let prefixed = self.prefixed_key(key);
        let bytes = self
            .timed(async {
                let mut conn = self.get_connection().await?;
                let bytes: Option<Vec<u8>> = conn
                    .get(&prefixed)
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
                Ok(bytes)
            })
            .await?;

        match bytes {
            Some(data) => {
                self.stats.write().hits += 1;
                let size = data.len();
                Ok(Some(CacheEntry::new(data, size)))
            }
            None => {
                self.stats.write().misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: &CacheOptions) -> Result<()> {
        let prefixed = self.prefixed_key(key);

        self.timed(async {
            let mut conn = self.get_connection().await?;
            let mut pipe = redis::pipe();
            match options.ttl {
                // EX 0 is rejected by the server
                Some(ttl) => pipe.set_ex(&prefixed, &value, ttl.as_secs().max(1)),
                None => pipe.set(&prefixed, &value),
            };
            pipe.query_async::<Vec<Value>>(&mut *conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            Ok(())
        })
        .await?;

        self.stats.write().writes += 1;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.delete_many(&[key]).await? > 0)
    }

    async fn delete_many(&self, keys: &[&str]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let prefixed_keys: Vec<String> = keys.iter().map(|k| self.prefixed_key(k)).collect();

        let count = self
            .timed(async {
                let mut conn = self.get_connection().await?;
                let count: u64 = conn
                    .del(&prefixed_keys)
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
                Ok(count)
            })
            .await?;

        self.stats.write().deletes += count;
        Ok(count)
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        if pattern.is_empty() {
            return Err(CacheError::Pattern("empty pattern".to_string()));
        }
        let prefixed = self.prefixed_key(pattern);
        let count = self.timed(self.unlink_matching(&prefixed)).await?;
        self.stats.write().deletes += count;
        Ok(count)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let prefixed = self.prefixed_key(key);
        self.timed(async {
            let mut conn = self.get_connection().await?;
            let exists: bool = conn
                .exists(&prefixed)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            Ok(exists)
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.timed(async {
            let mut conn = self.get_connection().await?;
            let _: String = redis::cmd("PING")
                .query_async(&mut *conn)
                .await
                .map_err(|e| CacheError::Connection(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        let pattern = self.prefixed_key("*");
        self.timed(self.unlink_matching(&pattern)).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        Ok(self.stats.read().clone())
    }

    async fn len(&self) -> Result<usize> {
        self.timed(async {
            let mut conn = self.get_connection().await?;
            match &self.config.key_prefix {
                Some(prefix) => {
                    let keys = Self::scan(&mut conn, &format!("{}:*", prefix)).await?;
                    Ok(keys.len())
                }
                None => {
                    let size: usize = redis::cmd("DBSIZE")
                        .query_async(&mut *conn)
                        .await
                        .map_err(|e| CacheError::Backend(e.to_string()))?;
                    Ok(size)
                }
            }
        })
        .await
    }
}
