// src/storage/aggregate.rs

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::Result;
use crate::storage::StatusStorage;

/// Attribute under which the aggregate record is stored in the inner storage
pub const AGGREGATE_KEY: &str = "AggregatedStats";

/// Default service slot of the aggregate record in the inner storage
pub const DEFAULT_STATS_PREFIX: &str = "CircuitBreakerStats";

/// service name -> attribute name -> value
pub type AggregateRecord = HashMap<String, HashMap<String, String>>;

#[derive(Debug, Default)]
struct AggregateState {
    /// Record as last loaded, with our own writes applied. `None` until the
    /// first access and again after every flush.
    stats: Option<AggregateRecord>,
    /// Writes made since the last flush
    pending: AggregateRecord,
}

/// Keeps the status of every service in one record of the inner storage.
///
/// Useful in front of a remote cache: one read loads all services and writes
/// are held back until a flushed save. A flush reloads the record, applies
/// the writes made since the previous flush on top of it and stores the
/// result, then forgets the record so the next access loads it again.
///
/// Two instances flushing at the same moment can still lose one side's
/// writes if both reload before either stores.
#[derive(Debug)]
pub struct AggregateStorage<S>
where
    S: StatusStorage,
{
    inner: S,
    stats_prefix: String,
    state: Mutex<AggregateState>,
}

impl<S> AggregateStorage<S>
where
    S: StatusStorage,
{
    pub fn new(inner: S) -> Self {
        Self::with_stats_prefix(inner, DEFAULT_STATS_PREFIX)
    }

    pub fn with_stats_prefix(inner: S, stats_prefix: impl Into<String>) -> Self {
        Self {
            inner,
            stats_prefix: stats_prefix.into(),
            state: Mutex::new(AggregateState::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Whether a loaded record is currently held
    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.stats.is_some()
    }

    async fn load_record(&self) -> Result<AggregateRecord> {
        let raw = self
            .inner
            .load_status(&self.stats_prefix, AGGREGATE_KEY)
            .await?;

        if raw.is_empty() {
            trace!(prefix = %self.stats_prefix, "No aggregate record stored yet");
            return Ok(AggregateRecord::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    async fn store_record(&self, record: &AggregateRecord) -> Result<()> {
        let encoded = serde_json::to_string(record)?;
        self.inner
            .save_status(&self.stats_prefix, AGGREGATE_KEY, &encoded, true)
            .await
    }
}

fn merge_into(target: &mut AggregateRecord, updates: &AggregateRecord) {
    for (service, attributes) in updates {
        let slot = target.entry(service.clone()).or_default();
        for (attribute, value) in attributes {
            slot.insert(attribute.clone(), value.clone());
        }
    }
}

#[async_trait]
impl<S> StatusStorage for AggregateStorage<S>
where
    S: StatusStorage,
{
    async fn load_status(&self, service_name: &str, attribute_name: &str) -> Result<String> {
        let mut state = self.state.lock().await;

        if state.stats.is_none() {
            let mut record = self.load_record().await?;
            merge_into(&mut record, &state.pending);
            state.stats = Some(record);
        }

        Ok(state
            .stats
            .as_ref()
            .and_then(|stats| stats.get(service_name))
            .and_then(|attributes| attributes.get(attribute_name))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_status(
        &self,
        service_name: &str,
        attribute_name: &str,
        value: &str,
        flush: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;

        state
            .pending
            .entry(service_name.to_string())
            .or_default()
            .insert(attribute_name.to_string(), value.to_string());
        if let Some(stats) = state.stats.as_mut() {
            stats
                .entry(service_name.to_string())
                .or_default()
                .insert(attribute_name.to_string(), value.to_string());
        }

        if !flush {
            return Ok(());
        }

        // reload right before writing to keep other writers' updates
        let mut fresh = self.load_record().await?;
        merge_into(&mut fresh, &state.pending);
        self.store_record(&fresh).await?;

        debug!(
            services = fresh.len(),
            flushed = state.pending.len(),
            "Aggregate record flushed"
        );

        state.pending.clear();
        state.stats = None;
        Ok(())
    }
}
