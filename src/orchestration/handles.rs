use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Result, SlidetrackError};

#[derive(Debug)]
struct LoopEntry {
    token: u64,
    handle: JoinHandle<()>,
}

/// Cancellable poll loops keyed by job id
///
/// At most one live loop per job id: a second registration is refused and
/// its handle aborted. Each loop carries a token so it can release its own
/// entry without touching a successor's.
#[derive(Debug, Default)]
pub struct LoopHandles {
    loops: Mutex<HashMap<String, LoopEntry>>,
    next_token: AtomicU64,
}

impl LoopHandles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for the next loop to be registered
    pub fn next_token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }

    pub fn register(&self, job_id: &str, token: u64, handle: JoinHandle<()>) -> Result<()> {
        let mut loops = self.loops.lock();
        if let Some(existing) = loops.get(job_id) {
            if !existing.handle.is_finished() {
                handle.abort();
                return Err(SlidetrackError::Orchestration(format!(
                    "Poll loop already active for job {job_id}"
                )));
            }
        }
        loops.insert(job_id.to_string(), LoopEntry { token, handle });
        Ok(())
    }

    /// Drop the entry for `job_id` if it still belongs to `token`
    ///
    /// Called by a loop that is exiting on its own; nothing is aborted.
    pub fn release(&self, job_id: &str, token: u64) -> bool {
        let mut loops = self.loops.lock();
        match loops.get(job_id) {
            Some(entry) if entry.token == token => {
                loops.remove(job_id);
                true
            }
            _ => false,
        }
    }

    /// Abort and forget the loop for `job_id`
    pub fn cancel(&self, job_id: &str) -> bool {
        let entry = self.loops.lock().remove(job_id);
        match entry {
            Some(entry) => {
                entry.handle.abort();
                debug!(job_id = %job_id, "Poll loop cancelled");
                true
            }
            None => false,
        }
    }

    /// Abort every loop; returns how many were cancelled
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.loops.lock().drain().collect();
        for (_, entry) in &drained {
            entry.handle.abort();
        }
        drained.len()
    }

    pub fn is_active(&self, job_id: &str) -> bool {
        self.loops
            .lock()
            .get(job_id)
            .is_some_and(|entry| !entry.handle.is_finished())
    }

    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .loops
            .lock()
            .iter()
            .filter(|(_, entry)| !entry.handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.loops.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.lock().is_empty()
    }
}
