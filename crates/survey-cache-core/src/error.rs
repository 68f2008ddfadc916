//! Error types for cache operations

use thiserror::Error;

/// Error type for every cache-tier operation
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Backend connection failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend operation failed
    #[error("backend error: {0}")]
    Backend(String),

    /// Key pattern could not be used for a scan
    #[error("invalid key pattern: {0}")]
    Pattern(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),

    /// Timeout
    #[error("operation timed out")]
    Timeout,
}

impl CacheError {
    /// Whether the error means the tier itself could not be reached,
    /// as opposed to a bad value or key.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            CacheError::Connection(_)
                | CacheError::Backend(_)
                | CacheError::Timeout
        )
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
