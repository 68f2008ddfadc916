//! Configuration for the results subsystem

use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use survey_cache_storage::{CircuitBreaker, MemoryConfig, RedisConfig};

use crate::error::ConfigError;
use crate::keys::Statistic;

/// How rating averages are reported when there are no responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyRatings {
    /// Report 0.0 for each dimension
    #[default]
    Zero,
    /// Report null, like the age and food statistics
    Null,
}

impl FromStr for EmptyRatings {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" | "0" => Ok(EmptyRatings::Zero),
            "null" | "none" => Ok(EmptyRatings::Null),
            other => Err(format!("expected `zero` or `null`, got `{}`", other)),
        }
    }
}

/// Per-statistic TTLs in seconds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StatisticTtls {
    pub total_count_secs: u64,
    pub rating_averages_secs: u64,
    pub food_distribution_secs: u64,
    pub age_statistics_secs: u64,
}

impl Default for StatisticTtls {
    fn default() -> Self {
        Self {
            total_count_secs: 120,
            rating_averages_secs: 300,
            food_distribution_secs: 300,
            age_statistics_secs: 300,
        }
    }
}

impl StatisticTtls {
    /// TTL for one statistic
    pub fn ttl_for(&self, statistic: Statistic) -> Duration {
        let secs = match statistic {
            Statistic::TotalCount => self.total_count_secs,
            Statistic::RatingAverages => self.rating_averages_secs,
            Statistic::FoodDistribution => self.food_distribution_secs,
            Statistic::AgeStatistics => self.age_statistics_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Everything needed to build the cache manager and repository
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// TTL for writes without an explicit one, including local backfills
    pub default_ttl_secs: u64,
    /// Local tier capacity
    pub max_local_entries: usize,
    /// Local tier expiry sweep period
    pub local_check_period_secs: u64,
    pub ttls: StatisticTtls,
    pub redis: RedisConfig,
    /// Consecutive distributed failures before the tier is skipped
    pub breaker_failure_threshold: u32,
    /// How long the tier is skipped once tripped
    pub breaker_reset_secs: u64,
    pub empty_ratings: EmptyRatings,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 300,
            max_local_entries: 1_000,
            local_check_period_secs: 60,
            ttls: StatisticTtls::default(),
            redis: RedisConfig::default(),
            breaker_failure_threshold: 3,
            breaker_reset_secs: 10,
            empty_ratings: EmptyRatings::default(),
        }
    }
}

impl ResultsConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns
    ///
    /// Recognized keys: `SURVEY_CACHE_DEFAULT_TTL`, `SURVEY_CACHE_MAX_ENTRIES`,
    /// `SURVEY_CACHE_CHECK_PERIOD`, `REDIS_URL`, `SURVEY_EMPTY_RATINGS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("SURVEY_CACHE_DEFAULT_TTL") {
            config.default_ttl_secs = parse_number("SURVEY_CACHE_DEFAULT_TTL", &value)?;
        }
        if let Some(value) = lookup("SURVEY_CACHE_MAX_ENTRIES") {
            config.max_local_entries = parse_number("SURVEY_CACHE_MAX_ENTRIES", &value)?;
        }
        if let Some(value) = lookup("SURVEY_CACHE_CHECK_PERIOD") {
            config.local_check_period_secs = parse_number("SURVEY_CACHE_CHECK_PERIOD", &value)?;
        }
        if let Some(value) = lookup("REDIS_URL") {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid("REDIS_URL", &value, "empty URL"));
            }
            config.redis.url = value.trim().to_string();
        }
        if let Some(value) = lookup("SURVEY_EMPTY_RATINGS") {
            config.empty_ratings = value
                .parse()
                .map_err(|e: String| ConfigError::invalid("SURVEY_EMPTY_RATINGS", &value, e))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl_secs == 0 {
            return Err(ConfigError::Zero("default_ttl_secs"));
        }
        if self.local_check_period_secs == 0 {
            return Err(ConfigError::Zero("local_check_period_secs"));
        }
        Ok(())
    }

    pub fn default_ttl(mut self, secs: u64) -> Self {
        self.default_ttl_secs = secs;
        self
    }

    pub fn max_local_entries(mut self, entries: usize) -> Self {
        self.max_local_entries = entries;
        self
    }

    pub fn redis(mut self, redis: RedisConfig) -> Self {
        self.redis = redis;
        self
    }

    pub fn ttls(mut self, ttls: StatisticTtls) -> Self {
        self.ttls = ttls;
        self
    }

    pub fn breaker(mut self, failure_threshold: u32, reset: Duration) -> Self {
        self.breaker_failure_threshold = failure_threshold;
        self.breaker_reset_secs = reset.as_secs();
        self
    }

    pub fn empty_ratings(mut self, policy: EmptyRatings) -> Self {
        self.empty_ratings = policy;
        self
    }

    pub fn default_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Local tier settings; the local tier expires entries on the manager default
    pub fn memory_config(&self) -> MemoryConfig {
        MemoryConfig::with_capacity(self.max_local_entries)
            .check_period(Duration::from_secs(self.local_check_period_secs))
            .default_ttl(self.default_ttl_duration())
    }

    pub fn circuit_breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(
            self.breaker_failure_threshold,
            Duration::from_secs(self.breaker_reset_secs),
        )
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, value, e))
}
