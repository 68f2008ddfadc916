use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use super::AggregateSource;
use crate::error::SourceError;
use crate::model::RatingAverages;

/// Aggregate queries over the `survey_responses` table
///
/// Expected columns: `date_of_birth DATE`, `foods TEXT` (comma separated)
/// and the integer rating columns `rating_movies`, `rating_radio`,
/// `rating_eat_out`, `rating_tv`.
#[derive(Debug, Clone)]
pub struct PgAggregateSource {
    pool: PgPool,
}

impl PgAggregateSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool; a failure here means the database is unreachable
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, SourceError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AggregateSource for PgAggregateSource {
    async fn count(&self) -> Result<u64, SourceError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM survey_responses")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(count).map_err(|e| SourceError::MalformedRow(e.to_string()))
    }

    async fn average_ratings(&self) -> Result<RatingAverages, SourceError> {
        let (movies, radio, eat_out, tv) =
            sqlx::query_as::<_, (Option<f64>, Option<f64>, Option<f64>, Option<f64>)>(
                "SELECT AVG(rating_movies)::float8, AVG(rating_radio)::float8, \
                 AVG(rating_eat_out)::float8, AVG(rating_tv)::float8 \
                 FROM survey_responses",
            )
            .fetch_one(&self.pool)
            .await?;
        Ok(RatingAverages {
            movies,
            radio,
            eat_out,
            tv,
        })
    }

    async fn scan_foods(&self) -> Result<Vec<String>, SourceError> {
        let rows = sqlx::query_scalar::<_, Option<String>>("SELECT foods FROM survey_responses")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().flatten().collect())
    }

    async fn scan_dates_of_birth(&self) -> Result<Vec<NaiveDate>, SourceError> {
        let rows = sqlx::query_scalar::<_, NaiveDate>("SELECT date_of_birth FROM survey_responses")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
