// src/breaker/handler.rs

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Notified when a service reaches its failure threshold or is let through
/// for a retry.
///
/// Called inline by the breaker, so implementations should return quickly and
/// must not fail. Under concurrent use the same transition may be reported
/// more than once, or not at all.
pub trait TripHandler: Send + Sync {
    fn tripped(&self, service_name: &str, failures: u64, message: &str);
}

/// One recorded handler call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripEvent {
    pub service_name: String,
    pub failures: u64,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl TripEvent {
    pub fn new(service_name: &str, failures: u64, message: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            failures,
            message: message.to_string(),
            at: Utc::now(),
        }
    }
}

/// Ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl TripHandler for NoopHandler {
    fn tripped(&self, _service_name: &str, _failures: u64, _message: &str) {}
}

/// Emits a warning event for every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl TripHandler for LoggingHandler {
    fn tripped(&self, service_name: &str, failures: u64, message: &str) {
        warn!(
            service = service_name,
            failures, message, "Circuit breaker notification"
        );
    }
}

/// Forwards notifications to an alerting task over an unbounded channel.
///
/// A dropped receiver is not an error; the event is discarded.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    sender: mpsc::UnboundedSender<TripEvent>,
}

impl ChannelHandler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TripEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl TripHandler for ChannelHandler {
    fn tripped(&self, service_name: &str, failures: u64, message: &str) {
        if self
            .sender
            .send(TripEvent::new(service_name, failures, message))
            .is_err()
        {
            debug!(service = service_name, "Trip event dropped, receiver closed");
        }
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<TripEvent>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TripEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl TripHandler for RecordingHandler {
    fn tripped(&self, service_name: &str, failures: u64, message: &str) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(TripEvent::new(service_name, failures, message));
    }
}

/// Adapts a closure, see [`handler_fn`]
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

impl<F> TripHandler for FnHandler<F>
where
    F: Fn(&str, u64, &str) + Send + Sync,
{
    fn tripped(&self, service_name: &str, failures: u64, message: &str) {
        (self.f)(service_name, failures, message)
    }
}

/// Turns a closure into a [`TripHandler`]
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&str, u64, &str) + Send + Sync,
{
    FnHandler { f }
}
