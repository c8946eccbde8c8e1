use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One accepted backend job submission and every resource it covers
///
/// Persisted under `processingTasks` as `{ taskId, recordIds, startTime }`
/// with `startTime` in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedJob {
    #[serde(rename = "taskId")]
    pub job_id: String,
    #[serde(rename = "recordIds")]
    pub resource_ids: Vec<String>,
    #[serde(rename = "startTime", with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
}

impl TrackedJob {
    pub fn new(
        job_id: impl Into<String>,
        resource_ids: Vec<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            resource_ids,
            started_at,
        }
    }

    pub fn covers(&self, resource_id: &str) -> bool {
        self.resource_ids.iter().any(|id| id == resource_id)
    }
}

/// Status reported by `GET /task-status/{task_id}`
///
/// Anything other than the three known values is kept verbatim as
/// `Unrecognized` and treated as still running.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RemoteTaskStatus {
    Pending,
    Success,
    Failed,
    Unrecognized(String),
}

impl RemoteTaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl From<String> for RemoteTaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Pending" => Self::Pending,
            "Success" => Self::Success,
            "Failed" => Self::Failed,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<&str> for RemoteTaskStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<RemoteTaskStatus> for String {
    fn from(status: RemoteTaskStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for RemoteTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Success => write!(f, "Success"),
            Self::Failed => write!(f, "Failed"),
            Self::Unrecognized(raw) => write!(f, "{raw}"),
        }
    }
}
