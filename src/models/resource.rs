use serde::{Deserialize, Serialize};
use std::fmt;

use super::api::TiffFile;
use super::job::{RemoteTaskStatus, TrackedJob};

/// Status shown for one resource row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResourceStatus {
    #[default]
    Ready,
    Processing,
    Success,
    Failed,
}

impl ResourceStatus {
    /// Success and Failed are final for a resource
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl From<&RemoteTaskStatus> for ResourceStatus {
    fn from(status: &RemoteTaskStatus) -> Self {
        match status {
            RemoteTaskStatus::Success => Self::Success,
            RemoteTaskStatus::Failed => Self::Failed,
            RemoteTaskStatus::Pending | RemoteTaskStatus::Unrecognized(_) => Self::Processing,
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::Processing => write!(f, "Processing"),
            Self::Success => write!(f, "Success"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Cached display row, persisted under `recordStatuses`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub name: String,
    pub date: String,
    pub size: String,
    pub status: ResourceStatus,
    #[serde(rename = "taskId", default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl ResourceRecord {
    /// Project a listed file onto a row, using the job that covers it (if any)
    pub fn from_file(file: &TiffFile, job: Option<&TrackedJob>) -> Self {
        Self {
            id: file.id.clone(),
            name: file.id.clone(),
            date: file.last_modified.clone(),
            size: format!("{:.2} MB", file.size_bytes),
            status: if job.is_some() {
                ResourceStatus::Processing
            } else {
                ResourceStatus::Ready
            },
            task_id: job.map(|j| j.job_id.clone()),
        }
    }
}
