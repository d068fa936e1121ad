// library entry
pub mod breaker;
pub mod config;
pub mod error;
pub mod factory;
pub mod logging;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export key components for convenience
pub use breaker::{Attempt, CircuitBreaker, ServiceSettings, TripEvent, TripHandler};
pub use config::{BreakerConfig, CacheConfig};
pub use error::{BreakerError, Result, StorageError};
pub use logging::init as init_logging;
pub use storage::{StatusStorage, StorageBackend};
