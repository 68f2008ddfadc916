//! Two-tier cache manager

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use survey_cache_core::{
    CacheBackend, CacheKey, CacheMetrics, CacheOperation, CacheOptions, CacheTier,
    EvictionReason, HealthReport, JsonSerializer, NoopMetrics, Result, Serializer, TierOutcome,
    VersionedKey,
};
use survey_cache_storage::{CircuitBreaker, MemoryBackend};

use crate::config::ResultsConfig;
use crate::keys::{survey_pattern, Statistic};

/// One logical cache over a distributed tier and a process-local tier
///
/// Reads go to the distributed tier first and fall back to the local tier;
/// writes and deletes go to both. Distributed-tier failures never reach the
/// caller: each call is folded into a [`TierOutcome`], logged and reported
/// to the metrics sink. A circuit breaker skips the distributed tier for a
/// while after repeated connectivity failures.
///
/// Generic over:
/// - `D`: the distributed tier (Redis in production, a fake in tests)
/// - `S`: the serializer
/// - `M`: the metrics sink
///
/// Cloning creates a new handle to the same tiers.
pub struct CacheManager<D, S = JsonSerializer, M = NoopMetrics>
where
    D: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    distributed: Arc<D>,
    local: MemoryBackend,
    serializer: Arc<S>,
    metrics: Arc<M>,
    breaker: CircuitBreaker,
    // Last known distributed connection state; false until a call succeeds
    distributed_healthy: Arc<AtomicBool>,
    default_ttl: Duration,
}

impl<D: CacheBackend> CacheManager<D, JsonSerializer, NoopMetrics> {
    /// Create a manager with the JSON serializer and no metrics
    pub fn new(distributed: D, config: &ResultsConfig) -> Self {
        Self::with_serializer_and_metrics(distributed, JsonSerializer, NoopMetrics, config)
    }
}

impl<D, S, M> CacheManager<D, S, M>
where
    D: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    /// Create a manager with custom serializer and metrics
    pub fn with_serializer_and_metrics(
        distributed: D,
        serializer: S,
        metrics: M,
        config: &ResultsConfig,
    ) -> Self {
        Self {
            distributed: Arc::new(distributed),
            local: MemoryBackend::new(config.memory_config()),
            serializer: Arc::new(serializer),
            metrics: Arc::new(metrics),
            breaker: config.circuit_breaker(),
            distributed_healthy: Arc::new(AtomicBool::new(false)),
            default_ttl: config.default_ttl_duration(),
        }
    }

    pub fn distributed(&self) -> &D {
        &self.distributed
    }

    pub fn local(&self) -> &MemoryBackend {
        &self.local
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Start the local tier's periodic expiry sweep
    pub fn spawn_local_cleanup(&self) -> JoinHandle<()> {
        self.local.spawn_cleanup()
    }

    /// Run one distributed-tier call through the breaker and health tracking
    async fn distributed_call<T>(
        &self,
        operation: CacheOperation,
        call: impl Future<Output = Result<T>>,
    ) -> TierOutcome<T> {
        if !self.breaker.allow_request() {
            debug!(
                target: "survey_cache",
                operation = operation.as_str(),
                "Distributed tier skipped, circuit open"
            );
            self.metrics
                .record_degraded(CacheTier::Distributed, operation);
            return TierOutcome::Skipped;
        }

        let outcome = TierOutcome::from_result(call.await);
        match &outcome {
            TierOutcome::Applied(_) => {
                self.breaker.report_success();
                self.distributed_healthy.store(true, Ordering::Relaxed);
            }
            TierOutcome::Failed(e) => {
                if e.is_connectivity() {
                    self.breaker.report_failure();
                    self.distributed_healthy.store(false, Ordering::Relaxed);
                } else {
                    // The tier answered; only the request was bad
                    self.breaker.report_success();
                }
                warn!(
                    target: "survey_cache",
                    tier = CacheTier::Distributed.as_str(),
                    operation = operation.as_str(),
                    error = %e,
                    "Distributed tier degraded"
                );
                self.metrics
                    .record_degraded(CacheTier::Distributed, operation);
            }
            TierOutcome::Skipped => {}
        }
        outcome
    }

    /// Get a value, distributed tier first
    ///
    /// A distributed hit is copied into the local tier with the default TTL.
    /// A distributed miss, failure or undecodable value falls through to the
    /// local tier. Absence is `None`, never an error.
    pub async fn get<T>(&self, key: impl CacheKey) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let key = key.full_key();
        let start = Instant::now();

        let outcome = self
            .distributed_call(CacheOperation::Get, self.distributed.get(&key))
            .await;
        if let TierOutcome::Applied(Some(entry)) = outcome {
            match self.serializer.deserialize::<T>(&entry.value) {
                Ok(value) => {
                    let options = CacheOptions::from(self.default_ttl);
                    if let Err(e) = self.local.set(&key, entry.value, &options).await {
                        warn!(target: "survey_cache", key = %key, error = %e, "Local backfill failed");
                    }
                    debug!(target: "survey_cache", key = %key, tier = "distributed", "Cache hit");
                    self.metrics.record_hit(&key, CacheTier::Distributed);
                    self.metrics
                        .record_latency(CacheOperation::Get, start.elapsed());
                    return Some(value);
                }
                Err(e) => {
                    warn!(
                        target: "survey_cache",
                        key = %key,
                        error = %e,
                        "Undecodable value in distributed tier"
                    );
                    self.metrics
                        .record_degraded(CacheTier::Distributed, CacheOperation::Get);
                }
            }
        }

        let value = match self.local.get(&key).await {
            Ok(Some(entry)) => match self.serializer.deserialize::<T>(&entry.value) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(target: "survey_cache", key = %key, error = %e, "Undecodable value in local tier");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(target: "survey_cache", key = %key, error = %e, "Local tier read failed");
                None
            }
        };

        if value.is_some() {
            debug!(target: "survey_cache", key = %key, tier = "local", "Cache hit");
            self.metrics.record_hit(&key, CacheTier::Local);
        } else {
            debug!(target: "survey_cache", key = %key, "Cache miss");
            self.metrics.record_miss(&key);
        }
        self.metrics
            .record_latency(CacheOperation::Get, start.elapsed());
        value
    }

    /// Write a value to both tiers
    ///
    /// Uses the default TTL when `ttl` is `None`. Returns true if at least
    /// one tier accepted the write.
    pub async fn set<T>(&self, key: impl CacheKey, value: &T, ttl: Option<Duration>) -> bool
    where
        T: Serialize,
    {
        let key = key.full_key();
        let start = Instant::now();

        let bytes = match self.serializer.serialize(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(target: "survey_cache", key = %key, error = %e, "Value not cached, serialization failed");
                self.metrics
                    .record_degraded(CacheTier::Distributed, CacheOperation::Set);
                self.metrics
                    .record_degraded(CacheTier::Local, CacheOperation::Set);
                return false;
            }
        };
        let options = CacheOptions::from(ttl.unwrap_or(self.default_ttl));

        let distributed = self
            .distributed_call(
                CacheOperation::Set,
                self.distributed.set(&key, bytes.clone(), &options),
            )
            .await;
        let local = self.local.set(&key, bytes, &options).await;
        if let Err(e) = &local {
            warn!(target: "survey_cache", key = %key, error = %e, "Local tier write failed");
            self.metrics
                .record_degraded(CacheTier::Local, CacheOperation::Set);
        }

        self.metrics
            .record_latency(CacheOperation::Set, start.elapsed());
        distributed.is_applied() || local.is_ok()
    }

    /// Delete one key from both tiers
    pub async fn delete(&self, key: impl CacheKey) -> bool {
        self.delete_many(&[key]).await
    }

    /// Delete keys from both tiers; true if either tier removed something
    pub async fn delete_many<K: CacheKey>(&self, keys: &[K]) -> bool {
        let start = Instant::now();
        let (distributed, local) = self.delete_both(keys).await;
        self.metrics
            .record_latency(CacheOperation::Delete, start.elapsed());
        distributed + local > 0
    }

    async fn delete_both<K: CacheKey>(&self, keys: &[K]) -> (u64, u64) {
        let keys: Vec<String> = keys.iter().map(|k| k.full_key()).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();

        let distributed = self
            .distributed_call(CacheOperation::Delete, self.distributed.delete_many(&refs))
            .await
            .applied()
            .unwrap_or(0);
        let local = match self.local.delete_many(&refs).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(target: "survey_cache", error = %e, "Local tier delete failed");
                0
            }
        };
        (distributed, local)
    }

    /// Pattern-delete in the distributed tier, then delete `known_keys` from both tiers
    ///
    /// The pattern covers keys the caller cannot enumerate; the explicit
    /// keys still reach the local tier when the distributed tier is down.
    /// Returns the number of entries removed across both tiers.
    pub async fn invalidate_pattern(&self, pattern: &str, known_keys: &[VersionedKey]) -> u64 {
        let start = Instant::now();

        let matched = self
            .distributed_call(
                CacheOperation::Invalidate,
                self.distributed.delete_matching(pattern),
            )
            .await
            .applied()
            .unwrap_or(0);
        let (distributed, local) = self.delete_both(known_keys).await;

        let removed = matched + distributed + local;
        if removed > 0 {
            self.metrics
                .record_eviction(EvictionReason::Invalidated, removed);
        }
        debug!(target: "survey_cache", pattern, removed, "Invalidated");
        self.metrics
            .record_latency(CacheOperation::Invalidate, start.elapsed());
        removed
    }

    /// Drop every survey statistic from both tiers
    pub async fn invalidate_survey_pattern(&self) -> u64 {
        let known: Vec<VersionedKey> = Statistic::ALL.iter().map(|s| s.key()).collect();
        self.invalidate_pattern(&survey_pattern(), &known).await
    }

    /// Report tier health without touching the network
    ///
    /// The local tier is always healthy; the distributed tier reports the
    /// outcome of its most recent call.
    pub fn health_check(&self) -> HealthReport {
        HealthReport::new(self.distributed_healthy.load(Ordering::Relaxed), true)
    }

    /// PING the distributed tier and report the refreshed health
    pub async fn probe(&self) -> HealthReport {
        let start = Instant::now();
        // A probe always goes out, even with the circuit open
        let outcome = TierOutcome::from_result(self.distributed.ping().await);
        match outcome.error() {
            None => {
                self.breaker.report_success();
                self.distributed_healthy.store(true, Ordering::Relaxed);
            }
            Some(e) => {
                warn!(target: "survey_cache", error = %e, "Distributed tier probe failed");
                self.distributed_healthy.store(false, Ordering::Relaxed);
                self.metrics
                    .record_degraded(CacheTier::Distributed, CacheOperation::Ping);
            }
        }
        self.metrics
            .record_latency(CacheOperation::Ping, start.elapsed());
        self.health_check()
    }
}

impl<D, S, M> Clone for CacheManager<D, S, M>
where
    D: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    fn clone(&self) -> Self {
        Self {
            distributed: Arc::clone(&self.distributed),
            local: self.local.clone(),
            serializer: Arc::clone(&self.serializer),
            metrics: Arc::clone(&self.metrics),
            breaker: self.breaker.clone(),
            distributed_healthy: Arc::clone(&self.distributed_healthy),
            default_ttl: self.default_ttl,
        }
    }
}
