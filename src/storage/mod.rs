// src/storage/mod.rs

pub mod adapter;
pub mod aggregate;
pub mod dummy;
pub mod fallback;
pub mod memory;
pub mod redis;

#[cfg(test)]
mod tests;

pub use adapter::CacheAdapter;
pub use aggregate::{AggregateRecord, AggregateStorage, AGGREGATE_KEY};
pub use dummy::DummyStorage;
pub use fallback::FallbackStorage;
pub use memory::MemoryStorage;
pub use redis::RedisStorage;

use super::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Status store the circuit breaker reads and writes its counters through.
///
/// Values are opaque strings keyed by `(service_name, attribute_name)`.
/// A value that was never written and a value written as `""` look the same.
#[async_trait]
pub trait StatusStorage: Send + Sync + Debug {
    /// Returns the stored value or an empty string if nothing was found
    async fn load_status(&self, service_name: &str, attribute_name: &str) -> Result<String>;

    /// Stores a value.
    ///
    /// With `flush` set the value must be visible to other instances when
    /// this returns. Without it the write may be buffered or never happen.
    async fn save_status(
        &self,
        service_name: &str,
        attribute_name: &str,
        value: &str,
        flush: bool,
    ) -> Result<()>;
}

#[async_trait]
impl<T> StatusStorage for Arc<T>
where
    T: StatusStorage + ?Sized,
{
    async fn load_status(&self, service_name: &str, attribute_name: &str) -> Result<String> {
        (**self).load_status(service_name, attribute_name).await
    }

    async fn save_status(
        &self,
        service_name: &str,
        attribute_name: &str,
        value: &str,
        flush: bool,
    ) -> Result<()> {
        (**self)
            .save_status(service_name, attribute_name, value, flush)
            .await
    }
}

/// Raw key-value cache that [`CacheAdapter`] builds a [`StatusStorage`] on
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    // The type of configuration this storage backend accepts
    type Config: Send + Sync;

    // Creates a new instance of this storage backend with the given configuration
    async fn new(config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    // Fails with StorageError::Unavailable when the medium cannot be used
    fn check_ready(&self) -> Result<()>;

    // Retrieves a value by key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    // Stores a value with a key
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    // Deletes a key
    async fn delete(&self, key: &str) -> Result<bool>;
}
