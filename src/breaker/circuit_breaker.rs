use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::handler::TripHandler;
use crate::breaker_event;
use crate::config::BreakerConfig;
use crate::error::{BreakerError, Result};
use crate::storage::StatusStorage;

/// Attribute holding the failure counter
pub const FAILURES: &str = "failures";

/// Attribute holding the Unix time of the last counter write
pub const LAST_TEST: &str = "lastTest";

/// Threshold and retry timeout of one service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Failures at which the service stops being available
    pub max_failures: u64,
    /// Time after the last counter write before a probe is let through
    pub retry_timeout: Duration,
}

/// Outcome of [`CircuitBreaker::attempt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T, E> {
    /// The operation ran and succeeded
    Succeeded(T),
    /// The operation ran and failed; the failure was reported
    Failed(E),
    /// The service was unavailable, the operation did not run
    Rejected,
}

impl<T, E> Attempt<T, E> {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Attempt::Rejected)
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Attempt::Succeeded(value) => Some(value),
            _ => None,
        }
    }
}

/// Tracks the availability of any number of services by name.
///
/// Counters live in the storage and are never cached here, so several
/// breakers (in one process or many) sharing a storage see each other's
/// reports. Nothing is locked across a read and the following write: two
/// callers can both be admitted as the retry probe, and concurrent reports
/// can overwrite each other. The counting rules are lopsided enough that the
/// counter still drifts the right way over many calls.
pub struct CircuitBreaker<S>
where
    S: StatusStorage,
{
    storage: S,
    config: BreakerConfig,
    settings: RwLock<HashMap<String, ServiceSettings>>,
    handlers: RwLock<HashMap<String, Arc<dyn TripHandler>>>,
    required_handlers: RwLock<HashSet<String>>,
}

impl<S> fmt::Debug for CircuitBreaker<S>
where
    S: StatusStorage,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("storage", &self.storage)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S> CircuitBreaker<S>
where
    S: StatusStorage,
{
    pub fn new(storage: S, config: BreakerConfig) -> Self {
        Self {
            storage,
            config,
            settings: RwLock::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
            required_handlers: RwLock::new(HashSet::new()),
        }
    }

    /// Breaker with 20 failures / 60 seconds for every service
    pub fn with_defaults(storage: S) -> Self {
        Self::new(storage, BreakerConfig::default())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn unavailable_message(&self) -> &str {
        &self.config.unavailable_message
    }

    pub fn retry_message(&self) -> &str {
        &self.config.retry_message
    }

    /// Overrides threshold and retry timeout for one service.
    ///
    /// A zero for either value means "use the instance default", so a
    /// threshold or timeout of zero cannot be configured this way.
    pub async fn set_service_settings(
        &self,
        service_name: &str,
        max_failures: u64,
        retry_timeout: Duration,
    ) {
        let settings = ServiceSettings {
            max_failures: if max_failures == 0 {
                self.config.default_max_failures
            } else {
                max_failures
            },
            retry_timeout: if retry_timeout.is_zero() {
                self.config.default_retry_timeout
            } else {
                retry_timeout
            },
        };
        debug!(
            service = service_name,
            max_failures = settings.max_failures,
            retry_timeout_secs = settings.retry_timeout.as_secs(),
            "Service settings updated"
        );
        self.settings
            .write()
            .await
            .insert(service_name.to_string(), settings);
    }

    /// Settings for a service, materializing the defaults on first lookup
    pub async fn service_settings(&self, service_name: &str) -> ServiceSettings {
        if let Some(settings) = self.settings.read().await.get(service_name) {
            return *settings;
        }

        let defaults = ServiceSettings {
            max_failures: self.config.default_max_failures,
            retry_timeout: self.config.default_retry_timeout,
        };
        *self
            .settings
            .write()
            .await
            .entry(service_name.to_string())
            .or_insert(defaults)
    }

    /// Sets the handler for a service, replacing any previous one
    pub async fn register_handler(&self, service_name: &str, handler: Arc<dyn TripHandler>) {
        self.handlers
            .write()
            .await
            .insert(service_name.to_string(), handler);
    }

    /// Makes reaching the threshold without a registered handler an error
    pub async fn require_handler(&self, service_name: &str) {
        self.required_handlers
            .write()
            .await
            .insert(service_name.to_string());
    }

    async fn handler_for(&self, service_name: &str) -> Option<Arc<dyn TripHandler>> {
        self.handlers.read().await.get(service_name).cloned()
    }

    async fn handler_required(&self, service_name: &str) -> bool {
        self.config.require_trip_handlers
            || self.required_handlers.read().await.contains(service_name)
    }

    /// Current failure count as stored
    pub async fn failures(&self, service_name: &str) -> Result<u64> {
        let raw = self.storage.load_status(service_name, FAILURES).await?;
        Ok(u64::try_from(leading_int(&raw)).unwrap_or(0))
    }

    /// Unix time of the last counter write as stored, 0 if never written
    pub async fn last_test(&self, service_name: &str) -> Result<i64> {
        let raw = self.storage.load_status(service_name, LAST_TEST).await?;
        Ok(leading_int(&raw))
    }

    // Both attributes are written together; only the second write is flushed
    async fn set_failures(&self, service_name: &str, failures: u64) -> Result<()> {
        self.storage
            .save_status(service_name, FAILURES, &failures.to_string(), false)
            .await?;
        self.storage
            .save_status(
                service_name,
                LAST_TEST,
                &Utc::now().timestamp().to_string(),
                true,
            )
            .await
    }

    /// Whether a call to the service should be attempted.
    ///
    /// Once the threshold is reached this returns `false` until the retry
    /// timeout has passed since the last counter write. The first caller to
    /// notice that gets `true` and refreshes the timestamp, which closes the
    /// window again for everyone who reads it afterwards.
    pub async fn is_available(&self, service_name: &str) -> Result<bool> {
        let failures = self.failures(service_name).await?;
        let settings = self.service_settings(service_name).await;

        if failures < settings.max_failures {
            breaker_event!(service_name, failures, settings.max_failures, true, "below threshold");
            return Ok(true);
        }

        // only the exact threshold notifies; a counter that skipped past it does not
        if failures == settings.max_failures {
            if let Some(handler) = self.handler_for(service_name).await {
                warn!(service = service_name, failures, "Service tripped");
                handler.tripped(service_name, failures, &self.config.unavailable_message);
            } else if self.handler_required(service_name).await {
                return Err(BreakerError::Config(format!(
                    "Handler for service {} has not been configured",
                    service_name
                )));
            }
        }

        let last_test = self.last_test(service_name).await?;
        let timeout = i64::try_from(settings.retry_timeout.as_secs()).unwrap_or(i64::MAX);
        let retry_after = last_test.saturating_add(timeout);
        if retry_after < Utc::now().timestamp() {
            // refresh lastTest first so other callers see the closed window
            self.set_failures(service_name, failures).await?;
            info!(service = service_name, failures, "Admitting retry probe");

            if let Some(handler) = self.handler_for(service_name).await {
                handler.tripped(service_name, failures, &self.config.retry_message);
            }

            breaker_event!(service_name, failures, settings.max_failures, true, "retry probe");
            return Ok(true);
        }

        breaker_event!(service_name, failures, settings.max_failures, false, "tripped");
        Ok(false)
    }

    /// Counts one failure; the counter has no upper bound
    pub async fn report_failure(&self, service_name: &str) -> Result<()> {
        let failures = self.failures(service_name).await?;
        self.set_failures(service_name, failures.saturating_add(1))
            .await
    }

    /// Counts one success.
    ///
    /// Above the threshold the counter drops to one below it; between one and
    /// the threshold it drops by one; at zero nothing is written.
    pub async fn report_success(&self, service_name: &str) -> Result<()> {
        let failures = self.failures(service_name).await?;
        let max_failures = self.service_settings(service_name).await.max_failures;

        if failures > max_failures {
            self.set_failures(service_name, max_failures.saturating_sub(1))
                .await
        } else if failures > 0 {
            self.set_failures(service_name, failures - 1).await
        } else {
            Ok(())
        }
    }

    /// Runs `operation` if the service is available and reports how it went.
    ///
    /// Storage and configuration errors from the breaker itself are returned
    /// as `Err`; the operation's own error comes back as [`Attempt::Failed`].
    pub async fn attempt<F, Fut, T, E>(
        &self,
        service_name: &str,
        operation: F,
    ) -> Result<Attempt<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if !self.is_available(service_name).await? {
            return Ok(Attempt::Rejected);
        }

        match operation().await {
            Ok(value) => {
                self.report_success(service_name).await?;
                Ok(Attempt::Succeeded(value))
            }
            Err(e) => {
                self.report_failure(service_name).await?;
                Ok(Attempt::Failed(e))
            }
        }
    }
}

// Integer prefix of a stored value: leading whitespace, an optional sign and
// digits. Anything after the digits is ignored, no digits at all reads as 0.
fn leading_int(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });
    if negative {
        -value
    } else {
        value
    }
}
