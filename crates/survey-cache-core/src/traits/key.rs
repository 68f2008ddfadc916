//! Cache key trait and versioned keys

use std::fmt;

/// Trait for types that can be used as cache keys
pub trait CacheKey: Send + Sync {
    /// Generate the key string
    fn cache_key(&self) -> String;

    /// Optional namespace for the key
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// Get the full key including namespace
    fn full_key(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}:{}", ns, self.cache_key()),
            None => self.cache_key(),
        }
    }
}

impl CacheKey for String {
    fn cache_key(&self) -> String {
        self.clone()
    }
}

impl CacheKey for &str {
    fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl CacheKey for &String {
    fn cache_key(&self) -> String {
        (*self).clone()
    }
}

/// A key of the form `<namespace>:<name>:v<version>`
///
/// Changing how a value is computed is done by bumping `version`; entries
/// under the old suffix are never read again and age out on their TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionedKey {
    namespace: &'static str,
    name: &'static str,
    version: u32,
}

impl VersionedKey {
    /// Create a new versioned key
    pub const fn new(namespace: &'static str, name: &'static str, version: u32) -> Self {
        Self {
            namespace,
            name,
            version,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Glob pattern matching every key in this key's namespace
    pub fn namespace_pattern(&self) -> String {
        format!("{}:*", self.namespace)
    }
}

impl CacheKey for VersionedKey {
    fn cache_key(&self) -> String {
        format!("{}:v{}", self.name, self.version)
    }

    fn namespace(&self) -> Option<&str> {
        Some(self.namespace)
    }
}

impl CacheKey for &VersionedKey {
    fn cache_key(&self) -> String {
        (*self).cache_key()
    }

    fn namespace(&self) -> Option<&str> {
        Some(self.namespace)
    }
}

impl fmt::Display for VersionedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:v{}", self.namespace, self.name, self.version)
    }
}
