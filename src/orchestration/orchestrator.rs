//! # Poll Orchestrator
//!
//! Runs one independent poll loop per tracked job, applies the status
//! reducer, deregisters finished jobs and emits one notification per
//! affected resource.
//!
//! Desired loops are always recomputed from the task registry: every job in
//! the registry that has not completed gets exactly one loop, and any loop
//! whose job has left the registry is cancelled.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PollingConfig;
use crate::error::{Result, SlidetrackError};
use crate::events::NotificationPublisher;
use crate::logging::log_job_operation;
use crate::models::{RemoteTaskStatus, ResourceStatus, TrackedJob};
use crate::registry::TaskRegistry;

use super::backend::JobBackend;
use super::board::ResourceBoard;
use super::handles::LoopHandles;
use super::poll_loop::{self, TickOutcome};
use super::reducer::{reduce, LoopAction};

/// Shared state behind the orchestrator and its loops
pub(crate) struct OrchestratorCore {
    backend: Arc<dyn JobBackend>,
    registry: Arc<TaskRegistry>,
    board: ResourceBoard,
    handles: LoopHandles,
    /// Jobs that reached a terminal status in this process
    completed: Mutex<HashSet<String>>,
    notifications: NotificationPublisher,
    interval: Duration,
    shut_down: AtomicBool,
}

impl OrchestratorCore {
    pub(crate) fn handles(&self) -> &LoopHandles {
        &self.handles
    }

    /// One status observation for `job_id`
    pub(crate) async fn tick(&self, job_id: &str) -> TickOutcome {
        let status = match self.backend.status(job_id).await {
            Ok(status) => status,
            Err(e) if e.is_unauthorized() => {
                warn!(job_id = %job_id, error = %e, "Status poll unauthorized");
                return TickOutcome::SessionEnded;
            }
            Err(e) => {
                warn!(
                    job_id = %job_id,
                    error = %e,
                    recoverable = e.is_recoverable(),
                    "Status poll failed; retrying next cadence"
                );
                return TickOutcome::Continue;
            }
        };

        let reduction = reduce(&status);
        debug!(job_id = %job_id, remote_status = %status, "Status observed");

        match reduction.action {
            LoopAction::ContinuePolling => {
                self.board.apply(job_id, reduction.display);
                TickOutcome::Continue
            }
            LoopAction::Complete => {
                self.complete(job_id, &status, reduction.display).await;
                TickOutcome::Finished
            }
        }
    }

    async fn complete(&self, job_id: &str, status: &RemoteTaskStatus, display: ResourceStatus) {
        let transitioned = self.board.apply(job_id, display);
        let first = self.completed.lock().insert(job_id.to_string());

        if first {
            for resource_id in &transitioned {
                self.notifications.notify_task_status(status, resource_id);
            }
        }
        log_job_operation("complete", job_id, transitioned.len(), &display.to_string());

        // Runs outside the loop task so cancelling the loop cannot interrupt it.
        // A failure leaves the job in the completed set; shutdown retries it.
        let registry = Arc::clone(&self.registry);
        let owned_id = job_id.to_string();
        let removal = tokio::spawn(async move { registry.remove(&owned_id).await });
        match removal.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(job_id = %job_id, error = %e, "Could not deregister completed job"),
            Err(e) => warn!(job_id = %job_id, error = %e, "Deregistration task failed"),
        }
    }
}

/// Tracks every in-flight job until it reaches a terminal status
#[derive(Clone)]
pub struct PollOrchestrator {
    core: Arc<OrchestratorCore>,
}

impl fmt::Debug for PollOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollOrchestrator")
            .field("interval", &self.core.interval)
            .field("active_loops", &self.core.handles.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl PollOrchestrator {
    pub fn new(
        backend: Arc<dyn JobBackend>,
        registry: Arc<TaskRegistry>,
        notifications: NotificationPublisher,
        config: &PollingConfig,
    ) -> Self {
        Self {
            core: Arc::new(OrchestratorCore {
                backend,
                registry,
                board: ResourceBoard::new(),
                handles: LoopHandles::new(),
                completed: Mutex::new(HashSet::new()),
                notifications,
                interval: config.interval(),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn board(&self) -> &ResourceBoard {
        &self.core.board
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.core.registry
    }

    pub fn notifications(&self) -> &NotificationPublisher {
        &self.core.notifications
    }

    /// Jobs with a live poll loop, sorted
    pub fn active_jobs(&self) -> Vec<String> {
        self.core.handles.active_ids()
    }

    pub fn is_polling(&self, job_id: &str) -> bool {
        self.core.handles.is_active(job_id)
    }

    pub fn completed_jobs(&self) -> BTreeSet<String> {
        self.core.completed.lock().iter().cloned().collect()
    }

    pub fn is_shut_down(&self) -> bool {
        self.core.shut_down.load(Ordering::Acquire)
    }

    /// Submit resources as one job and start tracking it
    pub async fn submit(&self, resource_ids: Vec<String>) -> Result<TrackedJob> {
        self.ensure_running()?;
        let resource_ids = validate_selection(resource_ids)?;

        let job_id = self.core.backend.submit(&resource_ids).await?;
        let job = self.core.registry.add(&job_id, resource_ids).await?;

        for resource_id in &job.resource_ids {
            self.core
                .notifications
                .notify_task_status(&RemoteTaskStatus::Pending, resource_id);
        }
        log_job_operation("submit", &job.job_id, job.resource_ids.len(), "Processing");

        self.reconcile().await?;
        Ok(job)
    }

    /// Resume tracking of jobs persisted by an earlier process
    pub async fn resume(&self) -> Result<usize> {
        self.ensure_running()?;
        self.reconcile().await?;
        let active = self.core.handles.len();
        info!(active_loops = active, "Resumed tracked jobs");
        Ok(active)
    }

    /// Bring live loops in line with the registry
    pub async fn reconcile(&self) -> Result<()> {
        if self.is_shut_down() {
            return Ok(());
        }

        let jobs = self.core.registry.list().await?;
        let completed = self.core.completed.lock().clone();

        let mut desired: Vec<TrackedJob> = Vec::new();
        let mut registered = HashSet::new();
        for job in jobs {
            if registered.insert(job.job_id.clone()) && !completed.contains(&job.job_id) {
                desired.push(job);
            }
        }

        // A completed job still in the registry is mid-deregistration; its
        // loop releases itself once the removal lands.
        for job_id in self.core.handles.active_ids() {
            if !registered.contains(&job_id) {
                self.core.handles.cancel(&job_id);
            }
        }

        for job in desired {
            if !self.core.handles.is_active(&job.job_id) {
                self.start_loop(&job);
            }
        }
        Ok(())
    }

    fn start_loop(&self, job: &TrackedJob) {
        self.core.board.track(job);

        let token = self.core.handles.next_token();
        let handle = poll_loop::spawn(
            Arc::clone(&self.core),
            job.job_id.clone(),
            token,
            self.core.interval,
        );

        match self.core.handles.register(&job.job_id, token, handle) {
            Ok(()) => log_job_operation("poll_start", &job.job_id, job.resource_ids.len(), "Processing"),
            Err(e) => debug!(job_id = %job.job_id, error = %e, "Poll loop not started"),
        }
    }

    /// Stop every loop without touching the registry
    ///
    /// Used when the session ends; `reconcile` after a new login resumes them.
    pub fn stop_all(&self) -> usize {
        self.core.handles.cancel_all()
    }

    /// Give up on a job permanently
    ///
    /// Stops its loop and removes it from the registry; resource status is
    /// left as it was.
    pub async fn abandon(&self, job_id: &str) -> Result<bool> {
        self.core.handles.cancel(job_id);
        let removed = self.core.registry.remove(job_id).await?;
        log_job_operation("abandon", job_id, 0, "Abandoned");
        Ok(removed)
    }

    /// Lifecycle teardown
    ///
    /// Cancels every loop and removes completed jobs from the registry.
    /// Safe to call repeatedly and concurrently with loops finishing.
    pub async fn shutdown(&self) -> Result<()> {
        self.core.shut_down.store(true, Ordering::Release);
        let cancelled = self.core.handles.cancel_all();

        let completed: Vec<String> = self.core.completed.lock().iter().cloned().collect();
        let mut first_error = None;
        for job_id in &completed {
            if let Err(e) = self.core.registry.remove(job_id).await {
                warn!(job_id = %job_id, error = %e, "Could not deregister job during shutdown");
                first_error.get_or_insert(e);
            }
        }

        info!(
            cancelled_loops = cancelled,
            completed_jobs = completed.len(),
            "Poll orchestrator shut down"
        );
        first_error.map_or(Ok(()), Err)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(SlidetrackError::Orchestration(
                "Poll orchestrator is shut down".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reject empty selections and blank ids; drop repeats keeping first order
///
/// Ids are kept exactly as given so they keep matching the listed rows.
fn validate_selection(resource_ids: Vec<String>) -> Result<Vec<String>> {
    if resource_ids.is_empty() {
        return Err(SlidetrackError::validation("No resources selected"));
    }

    let mut seen = HashSet::new();
    let mut selection = Vec::with_capacity(resource_ids.len());
    for id in resource_ids {
        if id.trim().is_empty() {
            return Err(SlidetrackError::validation("Resource id must not be blank"));
        }
        if seen.insert(id.clone()) {
            selection.push(id);
        }
    }
    Ok(selection)
}
