use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::error::{Result, SlidetrackError};
use crate::models::RemoteTaskStatus;
use crate::orchestration::JobBackend;

/// One scripted answer to a status request
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Status(RemoteTaskStatus),
    Unauthorized,
    Transport,
}

impl ScriptedReply {
    fn answer(&self) -> Result<RemoteTaskStatus> {
        match self {
            ScriptedReply::Status(status) => Ok(status.clone()),
            ScriptedReply::Unauthorized => Err(SlidetrackError::unauthorized("session ended")),
            ScriptedReply::Transport => {
                Err(SlidetrackError::Transport("connection reset".to_string()))
            }
        }
    }
}

/// Job backend with scripted submissions and status replies
///
/// Status replies for a job are consumed in order and the last one repeats.
/// A job with no script reports `Pending`.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    job_ids: Mutex<VecDeque<String>>,
    replies: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    submitted: Mutex<Vec<Vec<String>>>,
    status_calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Job id handed out by the next submission
    pub fn accept_submission(&self, job_id: &str) {
        self.job_ids.lock().push_back(job_id.to_string());
    }

    pub fn push_status(&self, job_id: &str, reply: ScriptedReply) {
        self.replies
            .lock()
            .entry(job_id.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Resource selections submitted so far
    pub fn submitted(&self) -> Vec<Vec<String>> {
        self.submitted.lock().clone()
    }

    pub fn status_calls(&self, job_id: &str) -> usize {
        self.status_calls.lock().get(job_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn submit(&self, resource_ids: &[String]) -> Result<String> {
        let job_id = self
            .job_ids
            .lock()
            .pop_front()
            .ok_or_else(|| SlidetrackError::remote(503, "no submission scripted"))?;
        self.submitted.lock().push(resource_ids.to_vec());
        Ok(job_id)
    }

    async fn status(&self, job_id: &str) -> Result<RemoteTaskStatus> {
        *self
            .status_calls
            .lock()
            .entry(job_id.to_string())
            .or_insert(0) += 1;

        let mut replies = self.replies.lock();
        let Some(queue) = replies.get_mut(job_id) else {
            return Ok(RemoteTaskStatus::Pending);
        };
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match reply {
            Some(reply) => reply.answer(),
            None => Ok(RemoteTaskStatus::Pending),
        }
    }
}
