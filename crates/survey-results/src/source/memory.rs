use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::AggregateSource;
use crate::error::SourceError;
use crate::model::{RatingAverages, SurveyResponse};

/// Number of queries served, per query kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryCounts {
    pub count: u64,
    pub averages: u64,
    pub foods: u64,
    pub dates_of_birth: u64,
}

impl QueryCounts {
    pub fn total(&self) -> u64 {
        self.count + self.averages + self.foods + self.dates_of_birth
    }
}

#[derive(Debug, Default)]
struct Counters {
    count: AtomicU64,
    averages: AtomicU64,
    foods: AtomicU64,
    dates_of_birth: AtomicU64,
}

/// Responses held in process memory
///
/// Every query bumps a counter, and [`fail_queries`](Self::fail_queries)
/// makes every query return [`SourceError::Query`].
#[derive(Debug, Default)]
pub struct InMemorySource {
    rows: RwLock<Vec<SurveyResponse>>,
    counters: Counters,
    failing: AtomicBool,
}

impl InMemorySource {
    /// Source over already validated rows
    pub fn new(rows: Vec<SurveyResponse>) -> Self {
        Self {
            rows: RwLock::new(rows),
            ..Default::default()
        }
    }

    /// Store a response after checking its ratings
    pub fn insert(&self, response: SurveyResponse) -> Result<(), SourceError> {
        response.validate()?;
        self.rows.write().push(response);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    pub fn queries(&self) -> QueryCounts {
        QueryCounts {
            count: self.counters.count.load(Ordering::Relaxed),
            averages: self.counters.averages.load(Ordering::Relaxed),
            foods: self.counters.foods.load(Ordering::Relaxed),
            dates_of_birth: self.counters.dates_of_birth.load(Ordering::Relaxed),
        }
    }

    /// Make every following query fail (or succeed again)
    pub fn fail_queries(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    fn begin(&self, counter: &AtomicU64, query: &str) -> Result<(), SourceError> {
        counter.fetch_add(1, Ordering::Relaxed);
        if self.failing.load(Ordering::Relaxed) {
            return Err(SourceError::Query(format!("{} unavailable", query)));
        }
        Ok(())
    }
}

fn mean(values: impl Iterator<Item = u8>) -> Option<f64> {
    let (sum, n) = values.fold((0u64, 0u64), |(sum, n), v| (sum + v as u64, n + 1));
    (n > 0).then(|| sum as f64 / n as f64)
}

#[async_trait]
impl AggregateSource for InMemorySource {
    async fn count(&self) -> Result<u64, SourceError> {
        self.begin(&self.counters.count, "count")?;
        Ok(self.rows.read().len() as u64)
    }

    async fn average_ratings(&self) -> Result<RatingAverages, SourceError> {
        self.begin(&self.counters.averages, "average_ratings")?;
        let rows = self.rows.read();
        Ok(RatingAverages {
            movies: mean(rows.iter().map(|r| r.ratings.movies)),
            radio: mean(rows.iter().map(|r| r.ratings.radio)),
            eat_out: mean(rows.iter().map(|r| r.ratings.eat_out)),
            tv: mean(rows.iter().map(|r| r.ratings.tv)),
        })
    }

    async fn scan_foods(&self) -> Result<Vec<String>, SourceError> {
        self.begin(&self.counters.foods, "scan_foods")?;
        Ok(self.rows.read().iter().map(|r| r.foods.clone()).collect())
    }

    async fn scan_dates_of_birth(&self) -> Result<Vec<NaiveDate>, SourceError> {
        self.begin(&self.counters.dates_of_birth, "scan_dates_of_birth")?;
        Ok(self.rows.read().iter().map(|r| r.date_of_birth).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Ratings;

    fn dob() -> NaiveDate {
        NaiveDate::from_ymd_opt(1995, 6, 15).unwrap()
    }

    #[tokio::test]
    async fn test_averages_are_unrounded() {
        let source = InMemorySource::default();
        source
            .insert(SurveyResponse::anonymous(dob(), "Pizza", Ratings::new(4, 4, 5, 4)))
            .unwrap();
        source
            .insert(SurveyResponse::anonymous(dob(), "Pasta", Ratings::new(5, 3, 4, 3)))
            .unwrap();
        source
            .insert(SurveyResponse::anonymous(dob(), "Pizza", Ratings::new(4, 4, 5, 4)))
            .unwrap();

        let averages = source.average_ratings().await.unwrap();
        assert_eq!(averages.movies, Some(13.0 / 3.0));
        assert_eq!(averages.eat_out, Some(14.0 / 3.0));
        assert_eq!(source.count().await.unwrap(), 3);
        assert_eq!(source.queries().averages, 1);
        assert_eq!(source.queries().total(), 2);
    }

    #[tokio::test]
    async fn test_empty_source() {
        let source = InMemorySource::default();
        assert_eq!(source.count().await.unwrap(), 0);
        assert_eq!(source.average_ratings().await.unwrap(), RatingAverages::default());
        assert!(source.scan_foods().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_rejects_out_of_range() {
        let source = InMemorySource::default();
        let err = source
            .insert(SurveyResponse::anonymous(dob(), "Pizza", Ratings::new(4, 9, 5, 4)))
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse(_)));
        assert!(source.is_empty());
    }

    #[tokio::test]
    async fn test_failure_injection_still_counts() {
        let source = InMemorySource::default();
        source.fail_queries(true);
        assert!(matches!(source.count().await, Err(SourceError::Query(_))));
        assert_eq!(source.queries().count, 1);

        source.fail_queries(false);
        assert!(source.count().await.is_ok());
    }
}
