//! survey-results: cached aggregation of survey responses
//!
//! The crate computes the statistics shown on the survey results page
//! (response count, average ratings, food preference distribution and age
//! statistics) and keeps them in a two-tier cache:
//!
//! - a distributed tier (Redis) consulted first so every server instance
//!   sees the same values;
//! - a process-local tier that serves reads when the distributed tier is
//!   down and after it has been read once.
//!
//! ```rust,no_run
//! use survey_results::prelude::*;
//!
//! # async fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let config = ResultsConfig::from_env()?;
//! let source = InMemorySource::default();
//! let service = ResultsService::with_redis(source, &config)?;
//!
//! let results = service.get_results().await?;
//! println!("{}", serde_json::to_string(&results)?);
//!
//! // after a new response has been stored
//! service.invalidate_cache().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod keys;
pub mod logging;
mod manager;
mod model;
mod repository;
mod results;
pub mod source;

pub use survey_cache_core::{
    CacheBackend, CacheError, CacheKey, CacheMetrics, CacheTier, HealthReport, JsonSerializer,
    NoopMetrics, Serializer, TierOutcome, TracingMetrics, VersionedKey,
};
pub use survey_cache_storage::{CircuitBreaker, MemoryBackend, MemoryConfig, RedisConfig};

#[cfg(feature = "redis")]
pub use survey_cache_storage::RedisBackend;

pub use config::{EmptyRatings, ResultsConfig, StatisticTtls};
pub use error::{ConfigError, ResultsError, SourceError};
pub use keys::{survey_pattern, Statistic, KEY_VERSION, SURVEY_NAMESPACE};
pub use manager::CacheManager;
pub use model::{
    normalize_food, parse_foods, AgeStats, FoodCount, FoodPercentages, RatingAverages, Ratings,
    SurveyResponse, SurveyResults,
};
pub use repository::{age_on, round1, summarize_ages, tally_foods, AggregationRepository};
pub use results::{ResultsService, NAMED_FOODS};
pub use source::{AggregateSource, InMemorySource};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AggregateSource, AggregationRepository, CacheManager, EmptyRatings, InMemorySource,
        MemoryBackend, ResultsConfig, ResultsError, ResultsService, SourceError, Statistic,
        SurveyResponse, SurveyResults,
    };

    #[cfg(feature = "redis")]
    pub use crate::RedisBackend;
}

#[cfg(test)]
mod tests;
