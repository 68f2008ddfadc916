//! Tagged result of a single tier call

use crate::CacheError;

/// What happened when the manager called one tier
///
/// Tier failures are never handed to callers of the manager; they are
/// folded into this type so the manager can log and count them in one place.
#[derive(Debug, Clone)]
pub enum TierOutcome<T> {
    /// The tier answered
    Applied(T),
    /// The tier was called and failed
    Failed(CacheError),
    /// The tier was not called (circuit open)
    Skipped,
}

impl<T> TierOutcome<T> {
    /// Fold a tier result into an outcome
    pub fn from_result(result: Result<T, CacheError>) -> Self {
        match result {
            Ok(value) => TierOutcome::Applied(value),
            Err(e) => TierOutcome::Failed(e),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TierOutcome::Applied(_))
    }

    /// The error, if the tier was called and failed
    pub fn error(&self) -> Option<&CacheError> {
        match self {
            TierOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Extract the value, discarding failure details
    pub fn applied(self) -> Option<T> {
        match self {
            TierOutcome::Applied(value) => Some(value),
            _ => None,
        }
    }
}
