//! survey-cache-storage: the two physical cache tiers
//!
//! - [`MemoryBackend`]: process-local store with TTLs, an entry cap and a
//!   periodic expiry sweep.
//! - [`RedisBackend`] (feature `redis`): the shared network store.
//! - [`CircuitBreaker`]: stops calling a tier that keeps failing.

mod breaker;
mod pattern;
pub mod remote;

#[cfg(feature = "memory")]
pub mod memory;

pub use breaker::{BreakerState, CircuitBreaker};
pub use pattern::{glob_match, validate_pattern};
pub use remote::RedisConfig;

#[cfg(feature = "memory")]
pub use memory::{MemoryBackend, MemoryConfig};

#[cfg(feature = "redis")]
pub use remote::RedisBackend;
