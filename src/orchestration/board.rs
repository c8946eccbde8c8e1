use dashmap::DashMap;
use std::collections::BTreeMap;

use crate::models::{ResourceRecord, ResourceStatus, TiffFile, TrackedJob};

#[derive(Debug, Clone, PartialEq, Eq)]
struct BoardEntry {
    status: ResourceStatus,
    job_id: Option<String>,
}

/// UI-visible status of every resource
///
/// A resource no job has touched is `Ready`. Tracking a job marks its
/// resources `Processing` under that job; only updates from the same job
/// apply afterwards, and a terminal status for that job is never reverted.
#[derive(Debug, Default)]
pub struct ResourceBoard {
    entries: DashMap<String, BoardEntry>,
}

impl ResourceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, resource_id: &str) -> ResourceStatus {
        self.entries
            .get(resource_id)
            .map(|entry| entry.status)
            .unwrap_or_default()
    }

    /// Job currently responsible for a resource
    pub fn job_for(&self, resource_id: &str) -> Option<String> {
        self.entries
            .get(resource_id)
            .and_then(|entry| entry.job_id.clone())
    }

    /// Mark every resource of `job` as processing under it
    pub fn track(&self, job: &TrackedJob) {
        for resource_id in &job.resource_ids {
            self.entries.insert(
                resource_id.clone(),
                BoardEntry {
                    status: ResourceStatus::Processing,
                    job_id: Some(job.job_id.clone()),
                },
            );
        }
    }

    /// Apply a status observed for `job_id`
    ///
    /// Returns the resources that became terminal with this call, sorted.
    pub fn apply(&self, job_id: &str, status: ResourceStatus) -> Vec<String> {
        let mut transitioned = Vec::new();
        for mut entry in self.entries.iter_mut() {
            if entry.job_id.as_deref() != Some(job_id) || entry.status.is_terminal() {
                continue;
            }
            entry.status = status;
            if status.is_terminal() {
                transitioned.push(entry.key().clone());
            }
        }
        transitioned.sort();
        transitioned
    }

    pub fn snapshot(&self) -> BTreeMap<String, ResourceStatus> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.status))
            .collect()
    }

    /// Display row for a listed file
    pub fn project(&self, file: &TiffFile) -> ResourceRecord {
        let mut record = ResourceRecord::from_file(file, None);
        if let Some(entry) = self.entries.get(&file.id) {
            record.status = entry.status;
            record.task_id = entry.job_id.clone();
        }
        record
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
