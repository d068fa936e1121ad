// src/test_utils.rs

use super::error::{BreakerError, Result, StorageError};
use super::storage::{DummyStorage, StatusStorage, StorageBackend};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One save seen by [`CountingStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveCall {
    pub service_name: String,
    pub attribute_name: String,
    pub value: String,
    pub flush: bool,
}

/// Status storage spy: delegates to a [`DummyStorage`] and records calls
#[derive(Debug, Default)]
pub struct CountingStorage {
    inner: DummyStorage,
    loads: AtomicUsize,
    saves: Mutex<Vec<SaveCall>>,
}

impl CountingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn saves(&self) -> Vec<SaveCall> {
        self.saves.lock().unwrap().clone()
    }

    /// Writes straight to the inner storage without being counted
    pub async fn seed(&self, service_name: &str, attribute_name: &str, value: &str) {
        self.inner
            .save_status(service_name, attribute_name, value, true)
            .await
            .unwrap();
    }
}

#[async_trait]
impl StatusStorage for CountingStorage {
    async fn load_status(&self, service_name: &str, attribute_name: &str) -> Result<String> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_status(service_name, attribute_name).await
    }

    async fn save_status(
        &self,
        service_name: &str,
        attribute_name: &str,
        value: &str,
        flush: bool,
    ) -> Result<()> {
        self.saves.lock().unwrap().push(SaveCall {
            service_name: service_name.to_string(),
            attribute_name: attribute_name.to_string(),
            value: value.to_string(),
            flush,
        });
        self.inner
            .save_status(service_name, attribute_name, value, flush)
            .await
    }
}

/// Status storage whose medium is gone
#[derive(Debug, Default)]
pub struct FailingStorage {
    pub calls: AtomicUsize,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&self) -> BreakerError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        BreakerError::Storage(StorageError::Unavailable("simulated outage".to_string()))
    }
}

#[async_trait]
impl StatusStorage for FailingStorage {
    async fn load_status(&self, _service_name: &str, _attribute_name: &str) -> Result<String> {
        Err(self.fail())
    }

    async fn save_status(
        &self,
        _service_name: &str,
        _attribute_name: &str,
        _value: &str,
        _flush: bool,
    ) -> Result<()> {
        Err(self.fail())
    }
}

/// Key-value backend with a switch for its readiness check
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    pub data: Arc<Mutex<HashMap<String, (Vec<u8>, Option<Duration>)>>>,
    pub offline: Arc<AtomicBool>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<(Vec<u8>, Option<Duration>)> {
        self.data.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    type Config = ();

    async fn new(_config: Self::Config) -> Result<Self> {
        Ok(Self::new())
    }

    fn check_ready(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BreakerError::Storage(StorageError::Unavailable(
                "mock backend offline".to_string(),
            )));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().unwrap().get(key).map(|(v, _)| v.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_vec(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.data.lock().unwrap().remove(key).is_some())
    }
}
