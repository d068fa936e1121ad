// src/storage/memory.rs

// Local shared cache backend. Clones share one map, so every breaker in the
// process that holds a handle sees the same counters. Entries expire after
// their TTL, like a shared-memory cache would evict them.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use std::time::{Duration, Instant};
use tokio::time;
use tracing::debug;

use crate::config::InMemoryConfig;
use crate::error::{Result, StorageError};
use crate::storage::StorageBackend;

/// Entry in the in-memory storage
#[derive(Debug)]
struct MemoryEntry {
    value: Vec<u8>,
    expiry: Option<Instant>,
}

type EntryMap = HashMap<String, MemoryEntry>;

/// In-memory storage backend implementation
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    data: Arc<RwLock<EntryMap>>,
    config: InMemoryConfig,
    sweeping: bool,
}

impl MemoryStorage {
    /// Creates a new in-memory storage with the given configuration.
    ///
    /// The expiry sweeper is only started when called inside a tokio runtime
    /// and with a non-zero `cleanup_interval`; without it expired entries are
    /// still dropped lazily on access.
    pub fn new(config: InMemoryConfig) -> Self {
        let data = Arc::new(RwLock::new(HashMap::with_capacity(
            config.max_entries.min(10_000),
        )));

        let mut sweeping = false;
        if config.use_background_task && !config.cleanup_interval.is_zero() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let weak = Arc::downgrade(&data);
                handle.spawn(Self::sweep(weak, config.cleanup_interval));
                sweeping = true;
            }
        }

        Self {
            data,
            config,
            sweeping,
        }
    }

    /// Whether a background task is sweeping expired entries
    pub fn is_sweeping(&self) -> bool {
        self.sweeping
    }

    // Runs until the last handle to the map is dropped
    async fn sweep(data: Weak<RwLock<EntryMap>>, every: Duration) {
        let mut interval = time::interval(every);
        loop {
            interval.tick().await;
            match data.upgrade() {
                Some(data) => Self::cleanup_expired_entries(&data),
                None => break,
            }
        }
        debug!("Memory storage sweeper stopped");
    }

    /// Clean up expired entries
    fn cleanup_expired_entries(data: &RwLock<EntryMap>) {
        let now = Instant::now();
        if let Ok(mut data) = data.write() {
            data.retain(|_, entry| match entry.expiry {
                Some(expiry) => expiry > now,
                None => true,
            });
        }
    }

    /// Number of live entries, expired ones included until swept
    pub fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, EntryMap>> {
        self.data.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, EntryMap>> {
        self.data.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> crate::error::BreakerError {
    StorageError::Unavailable("memory storage lock poisoned".to_string()).into()
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    type Config = InMemoryConfig;

    async fn new(config: Self::Config) -> Result<Self> {
        Ok(Self::new(config))
    }

    fn check_ready(&self) -> Result<()> {
        if self.data.is_poisoned() {
            return Err(poisoned());
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        {
            let data = self.read()?;
            match data.get(key) {
                None => return Ok(None),
                Some(entry) => match entry.expiry {
                    Some(expiry) if expiry <= Instant::now() => {}
                    _ => return Ok(Some(entry.value.clone())),
                },
            }
        }

        // Key is expired, drop read lock and acquire write lock to remove it
        self.write()?.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut data = self.write()?;

        if data.len() >= self.config.max_entries && !data.contains_key(key) {
            return Err(StorageError::CapacityExceeded(
                "Maximum entries limit exceeded".to_string(),
            )
            .into());
        }

        let expiry = ttl.map(|duration| Instant::now() + duration);
        data.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_vec(),
                expiry,
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.write()?.remove(key).is_some())
    }
}
