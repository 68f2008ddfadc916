//! Core traits for cache operations

mod backend;
mod key;
mod metrics;
mod serializer;
mod tracing_metrics;

pub use backend::CacheBackend;
pub use key::{CacheKey, VersionedKey};
pub use metrics::{CacheMetrics, CacheOperation, CacheTier, EvictionReason, NoopMetrics};
pub use serializer::{JsonSerializer, Serializer};
pub use tracing_metrics::TracingMetrics;

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateAdapter;
