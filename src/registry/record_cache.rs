use std::sync::Arc;

use crate::constants::storage_keys;
use crate::error::Result;
use crate::models::ResourceRecord;
use crate::storage::{KeyValueStore, KeyValueStoreExt};

/// Cached resource rows, so a reload can paint before the file list returns
#[derive(Clone)]
pub struct RecordStatusCache {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for RecordStatusCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStatusCache").finish()
    }
}

impl RecordStatusCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn store(&self, records: &[ResourceRecord]) -> Result<()> {
        self.store
            .set_as(storage_keys::RECORD_STATUSES, &records)
            .await
    }

    pub async fn load(&self) -> Result<Vec<ResourceRecord>> {
        Ok(self
            .store
            .get_as(storage_keys::RECORD_STATUSES)
            .await?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceStatus;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_store_and_load() {
        let cache = RecordStatusCache::new(Arc::new(MemoryStore::new()));
        assert!(cache.load().await.unwrap().is_empty());

        let rows = vec![ResourceRecord {
            id: "a.tiff".into(),
            name: "a.tiff".into(),
            date: "2026-01-01".into(),
            size: "1.00 MB".into(),
            status: ResourceStatus::Success,
            task_id: None,
        }];
        cache.store(&rows).await.unwrap();
        assert_eq!(cache.load().await.unwrap(), rows);
    }
}
