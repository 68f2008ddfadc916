//! End-to-end tests for the results subsystem

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use survey_cache_core::{
    CacheBackend, CacheEntry, CacheError, CacheMetrics, CacheOperation, CacheOptions, CacheStats,
    CacheTier, EvictionReason, Result,
};

use crate::prelude::*;
use crate::{AgeStats, FoodCount, FoodPercentages, RatingAverages, Ratings};

/// Distributed tier that can never be reached
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FailingBackend;

fn refused<T>() -> Result<T> {
    Err(CacheError::Connection("connection refused".to_string()))
}

#[async_trait]
impl CacheBackend for FailingBackend {
    async fn get(&self, _key: &str) -> Result<Option<CacheEntry<Vec<u8>>>> {
        refused()
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _options: &CacheOptions) -> Result<()> {
        refused()
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        refused()
    }

    async fn delete_many(&self, _keys: &[&str]) -> Result<u64> {
        refused()
    }

    async fn delete_matching(&self, _pattern: &str) -> Result<u64> {
        refused()
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        refused()
    }

    async fn ping(&self) -> Result<()> {
        refused()
    }

    async fn clear(&self) -> Result<()> {
        refused()
    }

    async fn stats(&self) -> Result<CacheStats> {
        refused()
    }

    async fn len(&self) -> Result<usize> {
        refused()
    }
}

/// Metrics sink that counts events; clones share counts
#[derive(Debug, Clone, Default)]
pub(crate) struct CountingMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    degraded: Arc<AtomicU64>,
}

impl CountingMetrics {
    pub(crate) fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub(crate) fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub(crate) fn degraded(&self) -> u64 {
        self.degraded.load(Ordering::Relaxed)
    }
}

impl CacheMetrics for CountingMetrics {
    fn record_hit(&self, _key: &str, _tier: CacheTier) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self, _key: &str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, _operation: CacheOperation, _duration: Duration) {}

    fn record_degraded(&self, _tier: CacheTier, _operation: CacheOperation) {
        self.degraded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_eviction(&self, _reason: EvictionReason, _count: u64) {}
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

fn dob(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn response(foods: &str, ratings: [u8; 4]) -> SurveyResponse {
    let [movies, radio, eat_out, tv] = ratings;
    SurveyResponse::anonymous(
        dob(2000, 1, 1),
        foods,
        Ratings::new(movies, radio, eat_out, tv),
    )
}

type Repo<D> = AggregationRepository<Arc<InMemorySource>, D>;

fn repository_over<D: CacheBackend>(
    distributed: D,
    rows: Vec<SurveyResponse>,
    config: &ResultsConfig,
) -> (Repo<D>, Arc<InMemorySource>) {
    let source = Arc::new(InMemorySource::new(rows));
    let cache = CacheManager::new(distributed, config);
    let repository =
        AggregationRepository::new(Arc::clone(&source), cache, config).with_clock(today);
    (repository, source)
}

fn repository(rows: Vec<SurveyResponse>) -> (Repo<MemoryBackend>, Arc<InMemorySource>) {
    repository_over(
        MemoryBackend::with_defaults(),
        rows,
        &ResultsConfig::default(),
    )
}

fn service(
    rows: Vec<SurveyResponse>,
) -> (ResultsService<Arc<InMemorySource>, MemoryBackend>, Arc<InMemorySource>) {
    let (repository, source) = repository(rows);
    (ResultsService::new(repository), source)
}

fn three_responses() -> Vec<SurveyResponse> {
    vec![
        response("Pizza,Pasta", [4, 4, 5, 4]),
        response("Pizza,Burger", [5, 3, 4, 3]),
        response("Pap and Wors", [4, 4, 5, 4]),
    ]
}

#[tokio::test]
async fn test_each_statistic_queries_source_once() {
    let (repo, source) = repository(three_responses());

    assert_eq!(repo.total_count().await.unwrap(), 3);
    assert_eq!(repo.total_count().await.unwrap(), 3);
    assert_eq!(source.queries().count, 1);

    repo.average_ratings().await.unwrap();
    repo.average_ratings().await.unwrap();
    assert_eq!(source.queries().averages, 1);

    repo.food_distribution().await.unwrap();
    repo.food_distribution().await.unwrap();
    assert_eq!(source.queries().foods, 1);

    repo.age_statistics().await.unwrap();
    repo.age_statistics().await.unwrap();
    assert_eq!(source.queries().dates_of_birth, 1);
}

#[tokio::test]
async fn test_cached_value_survives_source_change() {
    let (repo, source) = repository(three_responses());
    assert_eq!(repo.total_count().await.unwrap(), 3);

    source.insert(response("Pizza", [1, 1, 1, 1])).unwrap();
    // Stale until invalidated or expired
    assert_eq!(repo.total_count().await.unwrap(), 3);

    repo.invalidate_cache().await;
    assert_eq!(repo.total_count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_statistics_cached_under_versioned_keys_with_their_ttls() {
    let (repo, _source) = repository(three_responses());
    repo.total_count().await.unwrap();
    repo.age_statistics().await.unwrap();

    let distributed = repo.cache().distributed();
    let count = distributed
        .get("survey:total-count:v1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(count.ttl, Some(Duration::from_secs(120)));
    assert_eq!(count.value, b"3".to_vec());

    let ages = distributed
        .get("survey:age-stats:v1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ages.ttl, Some(Duration::from_secs(300)));
}

#[tokio::test]
async fn test_unreachable_distributed_tier_falls_back_to_local() {
    let metrics = CountingMetrics::default();
    let config = ResultsConfig::default();
    let cache = CacheManager::with_serializer_and_metrics(
        FailingBackend,
        survey_cache_core::JsonSerializer,
        metrics.clone(),
        &config,
    );
    let source = Arc::new(InMemorySource::new(three_responses()));
    let repo = AggregationRepository::new(Arc::clone(&source), cache, &config).with_clock(today);

    assert!(repo.cache().set("survey:fallback:v1", &1u64, None).await);
    assert_eq!(repo.cache().get::<u64>("survey:fallback:v1").await, Some(1));

    assert_eq!(repo.total_count().await.unwrap(), 3);
    assert_eq!(repo.total_count().await.unwrap(), 3);
    assert_eq!(source.queries().count, 1);

    let health = repo.cache().health_check();
    assert!(!health.distributed_healthy);
    assert!(health.overall_healthy);
    assert!(metrics.degraded() > 0);
    assert!(metrics.hits() >= 2);
    assert_eq!(metrics.misses(), 1);
}

#[tokio::test]
async fn test_full_results_with_unreachable_distributed_tier() {
    let (repo, source) =
        repository_over(FailingBackend, three_responses(), &ResultsConfig::default());
    let service = ResultsService::new(repo);

    let first = service.get_results().await.unwrap();
    let second = service.get_results().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(source.queries().total(), 4);
}

#[tokio::test]
async fn test_invalidation_forces_recompute_of_every_statistic() {
    let (service, source) = service(three_responses());
    service.get_results().await.unwrap();
    assert_eq!(source.queries().total(), 4);

    service.invalidate_cache().await;
    for stat in Statistic::ALL {
        let cached = service.repository().cache().get::<serde_json::Value>(stat.key());
        assert!(cached.await.is_none());
    }

    service.get_results().await.unwrap();
    let queries = source.queries();
    assert_eq!(queries.count, 2);
    assert_eq!(queries.averages, 2);
    assert_eq!(queries.foods, 2);
    assert_eq!(queries.dates_of_birth, 2);
}

#[tokio::test]
async fn test_invalidation_with_unreachable_distributed_tier_clears_local() {
    let (repo, source) =
        repository_over(FailingBackend, three_responses(), &ResultsConfig::default());
    repo.food_distribution().await.unwrap();

    repo.invalidate_cache().await;
    repo.food_distribution().await.unwrap();
    assert_eq!(source.queries().foods, 2);
}

#[tokio::test]
async fn test_empty_source_null_and_zero_policy() {
    let (service, _source) = service(Vec::new());
    let results = service.get_results().await.unwrap();

    assert_eq!(results.total_count, 0);
    assert_eq!(results.food_percentages, FoodPercentages::default());
    assert_eq!(
        results.avg_ratings,
        RatingAverages {
            movies: Some(0.0),
            radio: Some(0.0),
            eat_out: Some(0.0),
            tv: Some(0.0),
        }
    );
    assert_eq!(results.age, AgeStats::default());
}

#[tokio::test]
async fn test_empty_ratings_null_policy() {
    let config = ResultsConfig::default().empty_ratings(EmptyRatings::Null);
    let (repo, _source) = repository_over(MemoryBackend::with_defaults(), Vec::new(), &config);
    assert_eq!(repo.average_ratings().await.unwrap(), RatingAverages::default());
}

#[tokio::test]
async fn test_age_statistics_null_without_valid_ages() {
    let future = SurveyResponse::anonymous(dob(2030, 1, 1), "Pizza", Ratings::new(3, 3, 3, 3));
    let (repo, _source) = repository(vec![future]);
    assert_eq!(repo.age_statistics().await.unwrap(), AgeStats::default());

    let (repo, _source) = repository(Vec::new());
    assert_eq!(repo.age_statistics().await.unwrap(), AgeStats::default());
}

#[tokio::test]
async fn test_age_statistics_against_clock() {
    let rows = vec![
        SurveyResponse::anonymous(dob(2000, 10, 17), "Pizza", Ratings::new(3, 3, 3, 3)),
        SurveyResponse::anonymous(dob(2000, 10, 18), "Pizza", Ratings::new(3, 3, 3, 3)),
        SurveyResponse::anonymous(dob(1990, 1, 1), "Pizza", Ratings::new(3, 3, 3, 3)),
    ];
    let (repo, _source) = repository(rows);

    let stats = repo.age_statistics().await.unwrap();
    assert_eq!(stats.min, Some(25));
    assert_eq!(stats.max, Some(36));
    // (26 + 25 + 36) / 3 = 29.0
    assert_eq!(stats.avg, Some(29.0));
}

#[tokio::test]
async fn test_food_distribution_order() {
    let rows = ["Pizza,Pasta", "Pizza,Burger", "Pasta,Salad", "Pizza"]
        .into_iter()
        .map(|foods| response(foods, [3, 3, 3, 3]))
        .collect();
    let (repo, _source) = repository(rows);

    assert_eq!(
        repo.food_distribution().await.unwrap(),
        vec![
            FoodCount::new("Pizza", 3),
            FoodCount::new("Pasta", 2),
            FoodCount::new("Burger", 1),
            FoodCount::new("Salad", 1),
        ]
    );
}

#[tokio::test]
async fn test_food_distribution_trims_whitespace() {
    let rows = vec![
        response(" Pizza , Pasta ", [3, 3, 3, 3]),
        response("Pizza,  Burger  ", [3, 3, 3, 3]),
    ];
    let (repo, _source) = repository(rows);

    assert_eq!(
        repo.food_distribution().await.unwrap(),
        vec![
            FoodCount::new("Pizza", 2),
            FoodCount::new("Pasta", 1),
            FoodCount::new("Burger", 1),
        ]
    );
}

#[tokio::test]
async fn test_average_rounded_to_one_decimal_in_cache() {
    let rows = vec![
        response("Pizza", [4, 3, 3, 3]),
        response("Pizza", [4, 3, 3, 3]),
        response("Pizza", [5, 3, 3, 3]),
    ];
    let (repo, _source) = repository(rows);
    assert_eq!(repo.average_ratings().await.unwrap().movies, Some(4.3));

    let cached: RatingAverages = repo
        .cache()
        .get(Statistic::RatingAverages.key())
        .await
        .unwrap();
    assert_eq!(cached.movies, Some(4.3));
}

#[tokio::test]
async fn test_end_to_end_results() {
    let (service, _source) = service(vec![
        response("Pizza,Pasta", [4, 4, 5, 4]),
        response("Pizza,Pap and Wors", [5, 3, 4, 3]),
        response("papandwors", [4, 4, 5, 4]),
    ]);

    let results = service.get_results().await.unwrap();
    assert_eq!(results.total_count, 3);
    assert_eq!(
        results.avg_ratings,
        RatingAverages {
            movies: Some(4.3),
            radio: Some(3.7),
            eat_out: Some(4.7),
            tv: Some(3.7),
        }
    );
    assert_eq!(results.food_percentages.pizza, Some(66.7));
    assert_eq!(results.food_percentages.pasta, Some(33.3));
    assert_eq!(results.food_percentages.pap_and_wors, Some(66.7));
    assert_eq!(results.age.min, Some(26));
    assert_eq!(results.age.max, Some(26));
}

#[tokio::test]
async fn test_repeated_food_in_one_response_counts_once() {
    let (service, _source) = service(vec![
        response("Pizza,pizza", [3, 3, 3, 3]),
        response("Pasta", [3, 3, 3, 3]),
    ]);

    let results = service.get_results().await.unwrap();
    assert_eq!(results.food_percentages.pizza, Some(50.0));
    assert_eq!(results.food_percentages.pasta, Some(50.0));
}

#[tokio::test]
async fn test_source_failure_fails_results_and_caches_nothing() {
    let (service, source) = service(three_responses());
    source.fail_queries(true);

    let err = service.get_results().await.unwrap_err();
    assert!(matches!(err, ResultsError::Source(SourceError::Query(_))));

    let cache = service.repository().cache();
    for stat in Statistic::ALL {
        assert!(cache.get::<serde_json::Value>(stat.key()).await.is_none());
    }

    source.fail_queries(false);
    assert_eq!(service.get_results().await.unwrap().total_count, 3);
}

#[tokio::test]
async fn test_one_failing_statistic_fails_whole_read() {
    let (service, source) = service(three_responses());
    // Warm three statistics so only the count query reaches the source
    service.repository().average_ratings().await.unwrap();
    service.repository().food_distribution().await.unwrap();
    service.repository().age_statistics().await.unwrap();

    source.fail_queries(true);
    assert!(service.get_results().await.is_err());
}

#[tokio::test]
async fn test_instances_share_distributed_tier() {
    let shared = MemoryBackend::with_defaults();
    let config = ResultsConfig::default();
    let (first, first_source) = repository_over(shared.clone(), three_responses(), &config);
    let (second, second_source) = repository_over(shared, three_responses(), &config);

    first.total_count().await.unwrap();
    second.total_count().await.unwrap();
    assert_eq!(first_source.queries().count, 1);
    assert_eq!(second_source.queries().count, 0);

    // Invalidation on one instance clears the shared tier for both
    second.invalidate_cache().await;
    let key = Statistic::TotalCount.key().to_string();
    assert!(!first.cache().distributed().exists(&key).await.unwrap());
}
