//! Aggregate data source contract
//!
//! The repository only needs four queries from the store that holds the
//! survey responses. Implementations:
//!
//! - [`InMemorySource`]: a vector of responses with query counters
//! - `PgAggregateSource` (feature `postgres`): the `survey_responses` table

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::error::SourceError;
use crate::model::RatingAverages;

pub use memory::{InMemorySource, QueryCounts};
#[cfg(feature = "postgres")]
pub use postgres::PgAggregateSource;

/// Queries the repository runs on a cache miss
#[async_trait]
pub trait AggregateSource: Send + Sync + 'static {
    /// Number of stored responses
    async fn count(&self) -> Result<u64, SourceError>;

    /// Native average of each rating column, unrounded; `None` when there are no rows
    async fn average_ratings(&self) -> Result<RatingAverages, SourceError>;

    /// Every row's persisted food list
    async fn scan_foods(&self) -> Result<Vec<String>, SourceError>;

    /// Every row's date of birth
    async fn scan_dates_of_birth(&self) -> Result<Vec<NaiveDate>, SourceError>;
}

#[async_trait]
impl<A: AggregateSource> AggregateSource for Arc<A> {
    async fn count(&self) -> Result<u64, SourceError> {
        (**self).count().await
    }

    async fn average_ratings(&self) -> Result<RatingAverages, SourceError> {
        (**self).average_ratings().await
    }

    async fn scan_foods(&self) -> Result<Vec<String>, SourceError> {
        (**self).scan_foods().await
    }

    async fn scan_dates_of_birth(&self) -> Result<Vec<NaiveDate>, SourceError> {
        (**self).scan_dates_of_birth().await
    }
}
