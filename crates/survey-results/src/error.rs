//! Error types for aggregation

use thiserror::Error;

/// Failure of the aggregate data source
///
/// These are never recovered from: the statistic is not computed and
/// nothing is cached.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("malformed row: {0}")]
    MalformedRow(String),

    #[error("invalid survey response: {0}")]
    InvalidResponse(String),

    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failure of a full results read
#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("failed to aggregate survey results: {0}")]
    Source(#[from] SourceError),

    #[error("cache setup failed: {0}")]
    Cache(#[from] survey_cache_core::CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invalid configuration value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
