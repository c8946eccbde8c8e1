use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::orchestrator::OrchestratorCore;

/// Result of one poll tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Non-terminal status or a transient failure
    Continue,
    /// Terminal status handled; this loop is done
    Finished,
    /// The session ended; every loop must stop
    SessionEnded,
}

/// Spawn the poll loop for one job
///
/// The first status request goes out one period after start. The loop
/// releases its own handle when it finishes.
pub(crate) fn spawn(
    core: Arc<OrchestratorCore>,
    job_id: String,
    token: u64,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(job_id = %job_id, period_ms = period.as_millis() as u64, "Poll loop started");

        loop {
            ticker.tick().await;

            match core.tick(&job_id).await {
                TickOutcome::Continue => {}
                TickOutcome::Finished => {
                    core.handles().release(&job_id, token);
                    debug!(job_id = %job_id, "Poll loop finished");
                    break;
                }
                TickOutcome::SessionEnded => {
                    let stopped = core.handles().cancel_all();
                    info!(job_id = %job_id, stopped = stopped, "Session ended; poll loops stopped");
                    break;
                }
            }
        }
    })
}
