// src/breaker/tests/mod.rs
//! Tests for the breaker core and trip handlers


// Common test utilities for breaker testing
pub(crate) mod utils {
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::breaker::CircuitBreaker;
    use crate::config::BreakerConfig;
    use crate::test_utils::CountingStorage;

    pub fn now() -> i64 {
        Utc::now().timestamp()
    }

    /// Breaker over a shared spy storage, defaults 20 / 60s
    pub fn spy_breaker() -> (CircuitBreaker<Arc<CountingStorage>>, Arc<CountingStorage>) {
        let storage = Arc::new(CountingStorage::new());
        let breaker = CircuitBreaker::new(Arc::clone(&storage), BreakerConfig::default());
        (breaker, storage)
    }

    /// Same as [`spy_breaker`] with one service configured
    pub async fn configured_breaker(
        service: &str,
        max_failures: u64,
        retry_timeout_secs: u64,
    ) -> (CircuitBreaker<Arc<CountingStorage>>, Arc<CountingStorage>) {
        let (breaker, storage) = spy_breaker();
        breaker
            .set_service_settings(
                service,
                max_failures,
                Duration::from_secs(retry_timeout_secs),
            )
            .await;
        (breaker, storage)
    }
}
