//! Cache-aside computation of the survey statistics

use chrono::{Datelike, Local, NaiveDate};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use survey_cache_core::{CacheBackend, CacheMetrics, JsonSerializer, NoopMetrics, Serializer};

use crate::config::{EmptyRatings, ResultsConfig, StatisticTtls};
use crate::error::SourceError;
use crate::keys::Statistic;
use crate::manager::CacheManager;
use crate::model::{normalize_food, parse_foods, AgeStats, FoodCount, RatingAverages};
use crate::source::AggregateSource;

/// Round to one decimal place, halves away from zero
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Civil-calendar age in whole years on `today`
///
/// `None` for a birth date after `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Mean (one decimal), min and max; all `None` for no ages
pub fn summarize_ages(ages: impl IntoIterator<Item = u32>) -> AgeStats {
    let mut count = 0u64;
    let mut sum = 0u64;
    let mut min = None;
    let mut max = None;
    for age in ages {
        count += 1;
        sum += u64::from(age);
        min = Some(min.map_or(age, |m: u32| m.min(age)));
        max = Some(max.map_or(age, |m: u32| m.max(age)));
    }

    if count == 0 {
        return AgeStats::default();
    }
    AgeStats {
        avg: Some(round1(sum as f64 / count as f64)),
        min,
        max,
    }
}

/// Count each distinct food across persisted food lists
///
/// Names are compared as stored (case-sensitive). A row counts each food at
/// most once: later items of the same row that normalize to an earlier one
/// are dropped, so no count exceeds the number of rows. The result is sorted
/// by count descending; ties keep the order foods were first seen in.
pub fn tally_foods<I, R>(rows: I) -> Vec<FoodCount>
where
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<FoodCount> = Vec::new();

    for row in rows {
        let mut seen = HashSet::new();
        for food in parse_foods(row.as_ref()) {
            if !seen.insert(normalize_food(&food)) {
                continue;
            }
            match index.get(&food) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(food.clone(), counts.len());
                    counts.push(FoodCount::new(food, 1));
                }
            }
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Computes each statistic on a cache miss and caches it with its own TTL
///
/// Source failures propagate and nothing is cached for them. Cached age
/// statistics are computed against the date at computation time and may be
/// up to one TTL stale around a respondent's birthday.
pub struct AggregationRepository<A, D, S = JsonSerializer, M = NoopMetrics>
where
    A: AggregateSource,
    D: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    source: Arc<A>,
    cache: CacheManager<D, S, M>,
    ttls: StatisticTtls,
    empty_ratings: EmptyRatings,
    today: Clock,
}

impl<A, D, S, M> AggregationRepository<A, D, S, M>
where
    A: AggregateSource,
    D: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    pub fn new(source: A, cache: CacheManager<D, S, M>, config: &ResultsConfig) -> Self {
        Self {
            source: Arc::new(source),
            cache,
            ttls: config.ttls.clone(),
            empty_ratings: config.empty_ratings,
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the date ages are computed against
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    pub fn source(&self) -> &A {
        &self.source
    }

    pub fn cache(&self) -> &CacheManager<D, S, M> {
        &self.cache
    }

    async fn cached<T, F, Fut>(&self, statistic: Statistic, compute: F) -> Result<T, SourceError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let key = statistic.key();
        if let Some(value) = self.cache.get::<T>(key).await {
            return Ok(value);
        }

        debug!(target: "survey_results", key = %key, "Computing statistic");
        let value = compute().await?;
        if !self
            .cache
            .set(key, &value, Some(self.ttls.ttl_for(statistic)))
            .await
        {
            warn!(target: "survey_results", key = %key, "Statistic computed but not cached");
        }
        Ok(value)
    }

    /// Number of responses
    pub async fn total_count(&self) -> Result<u64, SourceError> {
        self.cached(Statistic::TotalCount, || self.source.count()).await
    }

    /// Average of each rating, one decimal; empty columns per the configured policy
    pub async fn average_ratings(&self) -> Result<RatingAverages, SourceError> {
        self.cached(Statistic::RatingAverages, || async {
            let raw = self.source.average_ratings().await;
            raw.map(|averages| averages.resolve(self.empty_ratings))
        })
        .await
    }

    /// Count per food, most popular first
    pub async fn food_distribution(&self) -> Result<Vec<FoodCount>, SourceError> {
        self.cached(Statistic::FoodDistribution, || async {
            self.source.scan_foods().await.map(tally_foods)
        })
        .await
    }

    /// Age statistics; birth dates in the future are left out
    pub async fn age_statistics(&self) -> Result<AgeStats, SourceError> {
        self.cached(Statistic::AgeStatistics, || async {
            let dates = self.source.scan_dates_of_birth().await;
            let today = (self.today)();
            dates.map(|dates| {
                summarize_ages(dates.into_iter().filter_map(|dob| age_on(dob, today)))
            })
        })
        .await
    }

    /// Drop every cached statistic; called after a response is stored
    pub async fn invalidate_cache(&self) {
        let removed = self.cache.invalidate_survey_pattern().await;
        info!(target: "survey_results", removed, "Survey statistics invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(13.0 / 3.0), 4.3);
        assert_eq!(round1(11.0 / 3.0), 3.7);
        assert_eq!(round1(14.0 / 3.0), 4.7);
        assert_eq!(round1(4.25), 4.3);
        assert_eq!(round1(0.0), 0.0);
    }

    #[test]
    fn test_age_before_and_on_birthday() {
        let today = date(2026, 10, 17);
        assert_eq!(age_on(date(2000, 10, 17), today), Some(26));
        assert_eq!(age_on(date(2000, 10, 18), today), Some(25));
        assert_eq!(age_on(date(2000, 11, 1), today), Some(25));
        assert_eq!(age_on(date(2026, 10, 17), today), Some(0));
        assert_eq!(age_on(date(2026, 10, 18), today), None);
    }

    #[test]
    fn test_leap_day_birthday() {
        assert_eq!(age_on(date(2004, 2, 29), date(2025, 2, 28)), Some(20));
        assert_eq!(age_on(date(2004, 2, 29), date(2025, 3, 1)), Some(21));
    }

    #[test]
    fn test_summarize_ages() {
        assert_eq!(summarize_ages(Vec::new()), AgeStats::default());

        let stats = summarize_ages([20, 30, 31]);
        assert_eq!(stats.avg, Some(27.0));
        assert_eq!(stats.min, Some(20));
        assert_eq!(stats.max, Some(31));

        let stats = summarize_ages([20, 21, 21]);
        assert_eq!(stats.avg, Some(20.7));
    }

    #[test]
    fn test_tally_keeps_case_and_first_seen_order() {
        let counts = tally_foods(["Salad,pizza", "Pizza", "Salad"]);
        assert_eq!(
            counts,
            vec![
                FoodCount::new("Salad", 2),
                FoodCount::new("pizza", 1),
                FoodCount::new("Pizza", 1),
            ]
        );
        assert!(tally_foods(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_tally_counts_food_once_per_row() {
        let counts = tally_foods(["Pizza,pizza, PIZZA", "Pasta,Pasta"]);
        assert_eq!(
            counts,
            vec![FoodCount::new("Pizza", 1), FoodCount::new("Pasta", 1)]
        );
    }
}
