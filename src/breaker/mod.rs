// src/breaker/mod.rs
//! Failure accounting per named service.
//!
//! A [`CircuitBreaker`] answers one question for each call to an external
//! dependency: should we try it right now? It counts reported failures in a
//! [`StatusStorage`](crate::storage::StatusStorage), refuses calls once a
//! service reaches its threshold, and lets one probe through each time the
//! retry timeout elapses. [`TripHandler`]s hear about both events.

mod circuit_breaker;
mod handler;

#[cfg(test)]
mod tests;

pub use circuit_breaker::{Attempt, CircuitBreaker, ServiceSettings, FAILURES, LAST_TEST};
pub use handler::{
    handler_fn, ChannelHandler, FnHandler, LoggingHandler, NoopHandler, RecordingHandler,
    TripEvent, TripHandler,
};
