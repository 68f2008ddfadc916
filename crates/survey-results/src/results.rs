//! Results payload assembly

use survey_cache_core::{
    CacheBackend, CacheMetrics, HealthReport, JsonSerializer, NoopMetrics, Serializer,
};

use crate::config::ResultsConfig;
use crate::error::ResultsError;
use crate::manager::CacheManager;
use crate::model::{normalize_food, FoodCount, FoodPercentages, SurveyResults};
use crate::repository::{round1, AggregationRepository};
use crate::source::AggregateSource;

/// Foods reported as percentages, in display form
pub const NAMED_FOODS: [&str; 3] = ["Pizza", "Pasta", "Pap and Wors"];

fn percentage_of(distribution: &[FoodCount], food: &str, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let wanted = normalize_food(food);
    let count: u64 = distribution
        .iter()
        .filter(|entry| normalize_food(&entry.food) == wanted)
        .map(|entry| entry.count)
        .sum();
    Some(round1(count.min(total) as f64 / total as f64 * 100.0))
}

impl FoodPercentages {
    /// Percentages of `total` for the named foods; all null when `total` is zero
    pub fn from_distribution(distribution: &[FoodCount], total: u64) -> Self {
        let [pizza, pasta, pap_and_wors] = NAMED_FOODS;
        Self {
            pizza: percentage_of(distribution, pizza, total),
            pasta: percentage_of(distribution, pasta, total),
            pap_and_wors: percentage_of(distribution, pap_and_wors, total),
        }
    }
}

/// Produces the results payload from the four statistics
pub struct ResultsService<A, D, S = JsonSerializer, M = NoopMetrics>
where
    A: AggregateSource,
    D: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    repository: AggregationRepository<A, D, S, M>,
}

#[cfg(feature = "redis")]
impl<A: AggregateSource> ResultsService<A, survey_cache_storage::RedisBackend> {
    /// Wire a service to the configured Redis and start the local expiry sweep
    ///
    /// Does not contact Redis; an unreachable server only degrades reads and
    /// writes to the local tier. Must be called from within a Tokio runtime.
    pub fn with_redis(source: A, config: &ResultsConfig) -> Result<Self, ResultsError> {
        config.validate()?;
        let redis = survey_cache_storage::RedisBackend::new(config.redis.clone())?;
        let cache = CacheManager::new(redis, config);
        cache.spawn_local_cleanup();
        Ok(Self::new(AggregationRepository::new(source, cache, config)))
    }
}

impl<A, D, S, M> ResultsService<A, D, S, M>
where
    A: AggregateSource,
    D: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    pub fn new(repository: AggregationRepository<A, D, S, M>) -> Self {
        Self { repository }
    }

    /// Build the repository and service over an existing cache manager
    pub fn from_parts(source: A, cache: CacheManager<D, S, M>, config: &ResultsConfig) -> Self {
        Self::new(AggregationRepository::new(source, cache, config))
    }

    pub fn repository(&self) -> &AggregationRepository<A, D, S, M> {
        &self.repository
    }

    /// Fetch the four statistics concurrently and assemble the payload
    ///
    /// Any failing statistic fails the whole read; no partial payload is
    /// returned.
    pub async fn get_results(&self) -> Result<SurveyResults, ResultsError> {
        let (total_count, avg_ratings, foods, age) = tokio::try_join!(
            self.repository.total_count(),
            self.repository.average_ratings(),
            self.repository.food_distribution(),
            self.repository.age_statistics(),
        )?;

        Ok(SurveyResults {
            total_count,
            age,
            food_percentages: FoodPercentages::from_distribution(&foods, total_count),
            avg_ratings,
        })
    }

    /// Drop the cached statistics after a new response is stored
    pub async fn invalidate_cache(&self) {
        self.repository.invalidate_cache().await;
    }

    pub fn health_check(&self) -> HealthReport {
        self.repository.cache().health_check()
    }
}
