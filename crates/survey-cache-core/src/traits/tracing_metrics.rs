use crate::{CacheMetrics, CacheOperation, CacheTier, EvictionReason};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Metrics adapter that logs events via `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMetrics {
    service_name: Option<String>,
}

impl TracingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every event with a service name
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

impl CacheMetrics for TracingMetrics {
    fn record_hit(&self, key: &str, tier: CacheTier) {
        debug!(
            target: "survey_cache",
            event = "hit",
            key = %key,
            tier = tier.as_str(),
            service = ?self.service_name,
            "Cache Hit"
        );
    }

    fn record_miss(&self, key: &str) {
        debug!(
            target: "survey_cache",
            event = "miss",
            key = %key,
            service = ?self.service_name,
            "Cache Miss"
        );
    }

    fn record_latency(&self, operation: CacheOperation, duration: Duration) {
        trace!(
            target: "survey_cache",
            event = "latency",
            operation = operation.as_str(),
            duration_ms = duration.as_millis() as u64,
            service = ?self.service_name,
            "Cache Operation Latency"
        );
    }

    fn record_degraded(&self, tier: CacheTier, operation: CacheOperation) {
        warn!(
            target: "survey_cache",
            event = "degraded",
            tier = tier.as_str(),
            operation = operation.as_str(),
            service = ?self.service_name,
            "Cache Tier Degraded"
        );
    }

    fn record_eviction(&self, reason: EvictionReason, count: u64) {
        debug!(
            target: "survey_cache",
            event = "eviction",
            reason = reason.as_str(),
            count,
            service = ?self.service_name,
            "Cache Eviction"
        );
    }
}
