//! survey-cache-core: Core traits and types for the survey results cache
//!
//! This crate holds everything that is shared between the two cache tiers
//! (the process-local store and the distributed store) and the manager that
//! sits in front of them.

mod error;
mod traits;
mod types;

pub use error::{CacheError, Result};
pub use traits::*;
pub use types::*;
