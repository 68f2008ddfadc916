//! Cache keys for the survey statistics

use survey_cache_core::VersionedKey;

/// Namespace shared by every survey key
pub const SURVEY_NAMESPACE: &str = "survey";

/// Current shape version of the cached statistics
///
/// Bump this when a statistic's computation or serialized shape changes.
pub const KEY_VERSION: u32 = 1;

/// One of the four cached statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    TotalCount,
    RatingAverages,
    FoodDistribution,
    AgeStatistics,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::TotalCount,
        Statistic::RatingAverages,
        Statistic::FoodDistribution,
        Statistic::AgeStatistics,
    ];

    /// Statistic segment of the key
    pub const fn name(self) -> &'static str {
        match self {
            Statistic::TotalCount => "total-count",
            Statistic::RatingAverages => "rating-avg",
            Statistic::FoodDistribution => "food-dist",
            Statistic::AgeStatistics => "age-stats",
        }
    }

    /// Full versioned key, e.g. `survey:rating-avg:v1`
    pub const fn key(self) -> VersionedKey {
        VersionedKey::new(SURVEY_NAMESPACE, self.name(), KEY_VERSION)
    }
}

/// Pattern matching every key in the survey namespace
pub fn survey_pattern() -> String {
    Statistic::TotalCount.key().namespace_pattern()
}
