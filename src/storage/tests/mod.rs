// src/storage/tests/mod.rs

mod adapter_tests;
mod redis_tests;

// Common utilities for storage tests
pub(crate) mod common {
    use crate::error::Result;
    use crate::storage::StatusStorage;

    // Contract every status storage has to honour, checked through fresh reads
    pub async fn test_status_contract<S: StatusStorage>(storage: &S) -> Result<()> {
        // nothing stored yet
        assert_eq!(storage.load_status("svc", "failures").await?, "");

        storage.save_status("svc", "failures", "3", true).await?;
        assert_eq!(storage.load_status("svc", "failures").await?, "3");

        // attributes and services do not bleed into each other
        storage.save_status("svc", "lastTest", "1700000000", true).await?;
        storage.save_status("other", "failures", "9", true).await?;
        assert_eq!(storage.load_status("svc", "failures").await?, "3");
        assert_eq!(storage.load_status("svc", "lastTest").await?, "1700000000");
        assert_eq!(storage.load_status("other", "failures").await?, "9");

        // overwrite
        storage.save_status("svc", "failures", "4", true).await?;
        assert_eq!(storage.load_status("svc", "failures").await?, "4");

        // stored empty looks exactly like absent
        storage.save_status("svc", "failures", "", true).await?;
        assert_eq!(storage.load_status("svc", "failures").await?, "");

        Ok(())
    }
}
