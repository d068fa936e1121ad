use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogFormat;

// Ensure initialization happens only once
static INIT: Once = Once::new();

/// Initialize the logging system with sensible defaults.
///
/// Log level can be set using the RUST_LOG environment variable.
/// Example: RUST_LOG=debug,circuit_breaker=trace
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true) // racing callers are the interesting case
                    .with_line_number(true),
            )
            .try_init();

        if installed.is_ok() {
            tracing::info!("Logging initialized");
        }
    });
}

/// Same as [`init`] but emits one JSON object per event
pub fn init_json() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .try_init();

        if installed.is_ok() {
            tracing::info!("JSON logging initialized");
        }
    });
}

/// Initialize logging in the given output format
pub fn init_with(format: LogFormat) {
    match format {
        LogFormat::Text => init(),
        LogFormat::Json => init_json(),
    }
}

/// Macro for logging availability decisions
#[macro_export]
macro_rules! breaker_event {
    ($service:expr, $failures:expr, $max:expr, $available:expr, $reason:expr) => {
        tracing::debug!(
            service = $service,
            failures = $failures,
            max_failures = $max,
            available = $available,
            reason = $reason,
            "Availability check"
        )
    };
}

/// Macro for logging storage operations with timing
#[macro_export]
macro_rules! storage_op {
    ($operation:expr, $key:expr, $result:expr, $elapsed_ms:expr) => {
        tracing::debug!(
            operation = $operation,
            key = $key,
            success = $result.is_ok(),
            elapsed_ms = $elapsed_ms,
            "Storage operation"
        )
    };
}
