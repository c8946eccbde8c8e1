use async_trait::async_trait;

use crate::error::Result;
use crate::models::RemoteTaskStatus;

/// Remote job service the orchestrator submits to and polls
///
/// Implementations are expected to route `status` through a client that does
/// not count as user activity.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Submit resources for processing; returns the accepted job id
    async fn submit(&self, resource_ids: &[String]) -> Result<String>;

    async fn status(&self, job_id: &str) -> Result<RemoteTaskStatus>;
}
