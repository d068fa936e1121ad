// src/storage/dummy.rs

// Transient status storage. Nothing survives the instance, so it is only
// good for tests, one-off processes and as the fallback once a real backend
// has failed.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, StorageError};
use crate::storage::StatusStorage;

type ServiceMap = HashMap<String, HashMap<String, String>>;

#[derive(Debug, Default)]
pub struct DummyStorage {
    data: RwLock<ServiceMap>,
}

impl DummyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of services with at least one stored attribute
    pub fn service_count(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }
}

fn poisoned() -> StorageError {
    StorageError::Unavailable("dummy storage lock poisoned".to_string())
}

#[async_trait]
impl StatusStorage for DummyStorage {
    async fn load_status(&self, service_name: &str, attribute_name: &str) -> Result<String> {
        let data = self.data.read().map_err(|_| poisoned())?;
        Ok(data
            .get(service_name)
            .and_then(|attributes| attributes.get(attribute_name))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_status(
        &self,
        service_name: &str,
        attribute_name: &str,
        value: &str,
        _flush: bool,
    ) -> Result<()> {
        let mut data = self.data.write().map_err(|_| poisoned())?;
        data.entry(service_name.to_string())
            .or_default()
            .insert(attribute_name.to_string(), value.to_string());
        Ok(())
    }
}
