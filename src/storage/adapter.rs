// src/storage/adapter.rs

use async_trait::async_trait;
use std::time::Instant;

use crate::config::CacheConfig;
use crate::error::{BreakerError, Result, StorageError};
use crate::storage::{StatusStorage, StorageBackend};
use crate::storage_op;

/// Exposes any [`StorageBackend`] as a [`StatusStorage`].
///
/// Each attribute lives under its own key, `prefix + service + attribute`,
/// and is rewritten with the configured TTL on every save. Wrap it in an
/// [`AggregateStorage`](super::AggregateStorage) when round-trips are costly.
#[derive(Debug, Clone)]
pub struct CacheAdapter<B>
where
    B: StorageBackend,
{
    backend: B,
    config: CacheConfig,
}

impl<B> CacheAdapter<B>
where
    B: StorageBackend,
{
    pub fn new(backend: B, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Key under which an attribute is stored in the backend
    pub fn cache_key(&self, service_name: &str, attribute_name: &str) -> String {
        format!(
            "{}{}{}",
            self.config.cache_prefix, service_name, attribute_name
        )
    }

    fn ensure_ready(&self) -> Result<()> {
        self.backend.check_ready().map_err(|e| match e {
            BreakerError::Config(msg) => BreakerError::Storage(StorageError::Unavailable(msg)),
            storage => storage,
        })
    }
}

#[async_trait]
impl<B> StatusStorage for CacheAdapter<B>
where
    B: StorageBackend,
{
    async fn load_status(&self, service_name: &str, attribute_name: &str) -> Result<String> {
        self.ensure_ready()?;
        let key = self.cache_key(service_name, attribute_name);

        let started = Instant::now();
        let result = self.backend.get(&key).await;
        storage_op!("load", key.as_str(), result, started.elapsed().as_millis() as u64);

        match result? {
            Some(bytes) if !bytes.is_empty() => String::from_utf8(bytes).map_err(|e| {
                BreakerError::Storage(StorageError::Serialization(format!(
                    "value under {} is not UTF-8: {}",
                    key, e
                )))
            }),
            _ => Ok(String::new()),
        }
    }

    // Every write goes straight to the backend, so `flush` changes nothing here
    async fn save_status(
        &self,
        service_name: &str,
        attribute_name: &str,
        value: &str,
        _flush: bool,
    ) -> Result<()> {
        self.ensure_ready()?;
        let key = self.cache_key(service_name, attribute_name);

        let started = Instant::now();
        let result = self
            .backend
            .set(&key, value.as_bytes(), Some(self.config.ttl))
            .await;
        storage_op!("save", key.as_str(), result, started.elapsed().as_millis() as u64);

        result
    }
}
