//! Redis (distributed tier) backend

#[cfg(feature = "redis")]
mod backend;
mod config;

#[cfg(feature = "redis")]
pub use backend::RedisBackend;
pub use config::RedisConfig;
