// src/storage/fallback.rs

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{DummyStorage, StatusStorage};

/// Status storage that gives up on its primary after the first error.
///
/// A storage error means the instance that raised it must not be used again.
/// This wrapper serves that call and every later one from a transient
/// [`DummyStorage`] instead, so the breaker keeps counting locally for the
/// rest of the process lifetime.
///
/// ```plaintext
/// ┌─────────────┐   error    ┌──────────────┐
/// │   primary   │ ─────────► │ DummyStorage │
/// └─────────────┘  (sticky)  └──────────────┘
/// ```
#[derive(Debug)]
pub struct FallbackStorage<S>
where
    S: StatusStorage,
{
    primary: S,
    fallback: DummyStorage,
    failed_over: AtomicBool,
}

impl<S> FallbackStorage<S>
where
    S: StatusStorage,
{
    pub fn new(primary: S) -> Self {
        Self {
            primary,
            fallback: DummyStorage::new(),
            failed_over: AtomicBool::new(false),
        }
    }

    /// Whether the primary has been abandoned
    pub fn is_failed_over(&self) -> bool {
        self.failed_over.load(Ordering::SeqCst)
    }

    fn fail_over(&self, operation: &str, error: &crate::error::BreakerError) {
        if !self.failed_over.swap(true, Ordering::SeqCst) {
            warn!(
                operation,
                error = %error,
                "Primary status storage failed, switching to transient storage"
            );
        }
    }
}

#[async_trait]
impl<S> StatusStorage for FallbackStorage<S>
where
    S: StatusStorage,
{
    async fn load_status(&self, service_name: &str, attribute_name: &str) -> Result<String> {
        if !self.is_failed_over() {
            match self.primary.load_status(service_name, attribute_name).await {
                Ok(value) => return Ok(value),
                Err(e) => self.fail_over("load", &e),
            }
        }
        debug!(service = service_name, attribute = attribute_name, "Fallback load");
        self.fallback.load_status(service_name, attribute_name).await
    }

    async fn save_status(
        &self,
        service_name: &str,
        attribute_name: &str,
        value: &str,
        flush: bool,
    ) -> Result<()> {
        if !self.is_failed_over() {
            match self
                .primary
                .save_status(service_name, attribute_name, value, flush)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => self.fail_over("save", &e),
            }
        }
        debug!(service = service_name, attribute = attribute_name, "Fallback save");
        self.fallback
            .save_status(service_name, attribute_name, value, flush)
            .await
    }
}
