//! Cache backend trait

use async_trait::async_trait;
use crate::{CacheEntry, CacheError, CacheOptions, CacheStats};

/// Operations every cache tier must support
///
/// Both the in-process store and the distributed store implement this, so
/// the manager can treat them uniformly and tests can substitute either one.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Get a value from the cache
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry<Vec<u8>>>, CacheError>;

    /// Set a value in the cache
    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        options: &CacheOptions,
    ) -> Result<(), CacheError>;

    /// Delete a key from the cache
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Delete multiple keys
    ///
    /// Returns the number of keys that were deleted.
    async fn delete_many(&self, keys: &[&str]) -> Result<u64, CacheError>;

    /// Delete every key matching a glob pattern (`*`, `?`)
    ///
    /// Returns the number of keys that were deleted.
    async fn delete_matching(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Check if a key exists in the cache
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Round-trip to the tier to confirm it is reachable
    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    /// Clear all entries from the cache
    async fn clear(&self) -> Result<(), CacheError>;

    /// Get cache statistics
    async fn stats(&self) -> Result<CacheStats, CacheError>;

    /// Get the number of entries in the cache
    async fn len(&self) -> Result<usize, CacheError>;

    /// Check if the cache is empty
    async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }
}
