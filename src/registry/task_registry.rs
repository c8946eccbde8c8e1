use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::constants::storage_keys;
use crate::error::Result;
use crate::models::TrackedJob;
use crate::session::Clock;
use crate::storage::{KeyValueStore, KeyValueStoreExt};

/// Durable record of in-flight jobs
///
/// The single owner of tracked-job state; the orchestrator keeps only timer
/// handles. Mutations within this process are serialized so concurrent
/// `add`/`remove` calls cannot lose each other's writes.
pub struct TaskRegistry {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    write_lock: tokio::sync::Mutex<()>,
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("key", &storage_keys::PROCESSING_TASKS)
            .finish()
    }
}

impl TaskRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// All persisted jobs, in insertion order
    pub async fn list(&self) -> Result<Vec<TrackedJob>> {
        Ok(self
            .store
            .get_as::<Vec<TrackedJob>>(storage_keys::PROCESSING_TASKS)
            .await?
            .unwrap_or_default())
    }

    /// Append a job started now
    ///
    /// Not idempotent: adding the same id twice stores two entries.
    pub async fn add(&self, job_id: &str, resource_ids: Vec<String>) -> Result<TrackedJob> {
        let _guard = self.write_lock.lock().await;
        let job = TrackedJob::new(job_id, resource_ids, self.clock.now());

        let mut jobs = self.list().await?;
        jobs.push(job.clone());
        self.store
            .set_as(storage_keys::PROCESSING_TASKS, &jobs)
            .await?;

        debug!(job_id = %job_id, resources = job.resource_ids.len(), "Tracked job added");
        Ok(job)
    }

    /// Remove every entry for `job_id`; returns whether anything was removed
    pub async fn remove(&self, job_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut jobs = self.list().await?;
        let before = jobs.len();
        jobs.retain(|job| job.job_id != job_id);
        if jobs.len() == before {
            return Ok(false);
        }

        self.store
            .set_as(storage_keys::PROCESSING_TASKS, &jobs)
            .await?;
        debug!(job_id = %job_id, "Tracked job removed");
        Ok(true)
    }

    pub async fn contains(&self, job_id: &str) -> Result<bool> {
        Ok(self.list().await?.iter().any(|job| job.job_id == job_id))
    }

    /// First job covering `resource_id`
    pub async fn find_by_resource(&self, resource_id: &str) -> Result<Option<TrackedJob>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|job| job.covers(resource_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_helpers::ManualClock;
    use serde_json::json;

    fn registry() -> (Arc<MemoryStore>, TaskRegistry) {
        let store = Arc::new(MemoryStore::new());
        let registry = TaskRegistry::new(store.clone(), Arc::new(ManualClock::default()));
        (store, registry)
    }

    #[tokio::test]
    async fn test_add_list_remove() {
        let (_store, registry) = registry();
        registry
            .add("t1", vec!["A".into(), "B".into()])
            .await
            .unwrap();
        registry.add("t2", vec!["C".into()]).await.unwrap();

        let ids: Vec<_> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.job_id)
            .collect();
        assert_eq!(ids, vec!["t1", "t2"]);

        assert!(registry.remove("t1").await.unwrap());
        assert!(!registry.remove("t1").await.unwrap());
        assert!(!registry.contains("t1").await.unwrap());
        assert!(registry.contains("t2").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_add_stores_two_entries() {
        let (_store, registry) = registry();
        registry.add("t1", vec!["A".into()]).await.unwrap();
        registry.add("t1", vec!["A".into()]).await.unwrap();
        assert_eq!(registry.list().await.unwrap().len(), 2);

        registry.remove("t1").await.unwrap();
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_resource() {
        let (_store, registry) = registry();
        registry
            .add("t1", vec!["A".into(), "B".into()])
            .await
            .unwrap();

        let found = registry.find_by_resource("B").await.unwrap().unwrap();
        assert_eq!(found.job_id, "t1");
        assert!(registry.find_by_resource("Z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reads_layout_written_by_older_clients() {
        let (store, registry) = registry();
        store
            .set(
                storage_keys::PROCESSING_TASKS,
                json!([{"taskId": "legacy", "recordIds": ["x.tiff"], "startTime": 1_700_000_000_000_i64}]),
            )
            .await
            .unwrap();

        let jobs = registry.list().await.unwrap();
        assert_eq!(jobs[0].job_id, "legacy");
        assert_eq!(jobs[0].started_at.timestamp_millis(), 1_700_000_000_000);
    }
}
