//! Core types for cache operations

mod entry;
mod health;
mod options;
mod outcome;
mod stats;

pub use entry::CacheEntry;
pub use health::HealthReport;
pub use options::CacheOptions;
pub use outcome::TierOutcome;
pub use stats::CacheStats;
