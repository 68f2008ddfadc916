//! Metrics trait for cache observability

use std::time::Duration;

/// Cache tier for metrics labeling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    /// In-process store
    Local,
    /// Shared network store
    Distributed,
}

impl CacheTier {
    /// Get tier as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Local => "local",
            CacheTier::Distributed => "distributed",
        }
    }
}

/// Cache operation for latency tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Get,
    Set,
    Delete,
    Invalidate,
    Ping,
}

impl CacheOperation {
    /// Get operation as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOperation::Get => "get",
            CacheOperation::Set => "set",
            CacheOperation::Delete => "delete",
            CacheOperation::Invalidate => "invalidate",
            CacheOperation::Ping => "ping",
        }
    }
}

/// Reason for cache eviction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionReason {
    /// Explicitly invalidated
    Invalidated,
}

impl EvictionReason {
    /// Get reason as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Invalidated => "invalidated",
        }
    }
}

/// Sink for cache events
///
/// The manager reports every hit, miss and degraded tier call here.
pub trait CacheMetrics: Send + Sync + 'static {
    /// Record a cache hit on a tier
    fn record_hit(&self, key: &str, tier: CacheTier);

    /// Record a miss on both tiers
    fn record_miss(&self, key: &str);

    /// Record operation latency
    fn record_latency(&self, operation: CacheOperation, duration: Duration);

    /// Record a tier call that failed or was skipped and fell back
    fn record_degraded(&self, tier: CacheTier, operation: CacheOperation);

    /// Record an eviction
    fn record_eviction(&self, reason: EvictionReason, count: u64);
}

/// No-op metrics implementation (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    #[inline]
    fn record_hit(&self, _key: &str, _tier: CacheTier) {}

    #[inline]
    fn record_miss(&self, _key: &str) {}

    #[inline]
    fn record_latency(&self, _operation: CacheOperation, _duration: Duration) {}

    #[inline]
    fn record_degraded(&self, _tier: CacheTier, _operation: CacheOperation) {}

    #[inline]
    fn record_eviction(&self, _reason: EvictionReason, _count: u64) {}
}

/// Metrics adapter using the `metrics` crate
///
/// ```ignore
/// let metrics = MetricsCrateAdapter::new("survey_cache");
/// // Emits: survey_cache_hits_total, survey_cache_degraded_total, ...
/// ```
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsCrateAdapter {
    prefix: String,
}

#[cfg(feature = "metrics")]
impl MetricsCrateAdapter {
    /// Create a new adapter with the given metric name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn metric_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }
}

#[cfg(feature = "metrics")]
impl CacheMetrics for MetricsCrateAdapter {
    fn record_hit(&self, _key: &str, tier: CacheTier) {
        metrics::counter!(self.metric_name("hits_total"), "tier" => tier.as_str()).increment(1);
    }

    fn record_miss(&self, _key: &str) {
        metrics::counter!(self.metric_name("misses_total")).increment(1);
    }

    fn record_latency(&self, operation: CacheOperation, duration: Duration) {
        metrics::histogram!(
            self.metric_name("operation_duration_seconds"),
            "operation" => operation.as_str()
        )
        .record(duration.as_secs_f64());
    }

    fn record_degraded(&self, tier: CacheTier, operation: CacheOperation) {
        metrics::counter!(
            self.metric_name("degraded_total"),
            "tier" => tier.as_str(),
            "operation" => operation.as_str()
        )
        .increment(1);
    }

    fn record_eviction(&self, reason: EvictionReason, count: u64) {
        metrics::counter!(
            self.metric_name("evictions_total"),
            "reason" => reason.as_str()
        )
        .increment(count);
    }
}
