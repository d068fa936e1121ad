#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::CacheConfig;
    use crate::error::{BreakerError, StorageError};
    use crate::storage::{CacheAdapter, StatusStorage, StorageBackend};
    use crate::test_utils::MockBackend;

    use super::super::common;

    fn adapter_with_prefix(prefix: &str) -> CacheAdapter<MockBackend> {
        CacheAdapter::new(
            MockBackend::new(),
            CacheConfig {
                ttl: Duration::from_secs(120),
                cache_prefix: prefix.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_adapter_contract() {
        let adapter = adapter_with_prefix("CircuitBreaker");
        let result = common::test_status_contract(&adapter).await;
        assert!(result.is_ok(), "Adapter contract failed: {:?}", result);
    }

    #[tokio::test]
    async fn test_keys_are_prefix_service_attribute() {
        let adapter = adapter_with_prefix("cb:");
        adapter.save_status("db", "failures", "3", false).await.unwrap();
        adapter.save_status("db", "lastTest", "17", true).await.unwrap();

        assert_eq!(
            adapter.backend().keys(),
            vec!["cb:dbfailures".to_string(), "cb:dblastTest".to_string()]
        );
        assert_eq!(adapter.cache_key("x", "y"), "cb:xy");
    }

    #[tokio::test]
    async fn test_every_write_carries_ttl() {
        let adapter = adapter_with_prefix("p");
        adapter.save_status("db", "failures", "1", false).await.unwrap();

        let (value, ttl) = adapter.backend().raw("pdbfailures").unwrap();
        assert_eq!(value, b"1".to_vec());
        assert_eq!(ttl, Some(Duration::from_secs(120)));
    }

    #[tokio::test]
    async fn test_default_prefix() {
        let adapter = CacheAdapter::new(MockBackend::new(), CacheConfig::default());
        adapter.save_status("db", "failures", "1", true).await.unwrap();

        assert_eq!(adapter.backend().keys(), vec!["CircuitBreakerdbfailures".to_string()]);
        assert_eq!(adapter.config().ttl, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_backend_not_ready_is_storage_error() {
        let adapter = adapter_with_prefix("p");
        adapter.backend().set_offline(true);

        assert!(matches!(
            adapter.load_status("db", "failures").await,
            Err(BreakerError::Storage(StorageError::Unavailable(_)))
        ));
        assert!(matches!(
            adapter.save_status("db", "failures", "1", true).await,
            Err(BreakerError::Storage(StorageError::Unavailable(_)))
        ));
        assert!(adapter.backend().keys().is_empty());
    }

    #[tokio::test]
    async fn test_non_utf8_value_is_serialization_error() {
        let adapter = adapter_with_prefix("p");
        adapter
            .backend()
            .set("pdbfailures", &[0xff, 0xfe], None)
            .await
            .unwrap();

        assert!(matches!(
            adapter.load_status("db", "failures").await,
            Err(BreakerError::Storage(StorageError::Serialization(_)))
        ));
    }

    #[tokio::test]
    async fn test_deleted_key_reads_empty() {
        let adapter = adapter_with_prefix("p");
        adapter.save_status("db", "failures", "4", true).await.unwrap();
        assert!(adapter.backend().delete("pdbfailures").await.unwrap());

        assert_eq!(adapter.load_status("db", "failures").await.unwrap(), "");
    }
}
