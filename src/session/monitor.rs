//! Background session checks.
//!
//! Two independent tickers: the inactivity check (default every 60 s) and the
//! proactive refresh check (default every 30 s). Neither blocks in-flight
//! requests; both only call into the [`SessionManager`].

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;

use super::manager::SessionManager;

pub struct SessionMonitor {
    session: Arc<SessionManager>,
    inactivity_interval: Duration,
    refresh_interval: Duration,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for SessionMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("inactivity_interval", &self.inactivity_interval)
            .field("refresh_interval", &self.refresh_interval)
            .field("is_running", &self.is_running())
            .finish()
    }
}

impl SessionMonitor {
    pub fn new(session: Arc<SessionManager>, config: &SessionConfig) -> Self {
        Self {
            session,
            inactivity_interval: config.inactivity_check_interval(),
            refresh_interval: config.refresh_check_interval(),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Start both checks; calling again while running does nothing
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            warn!("Session monitor already running");
            return;
        }

        info!(
            inactivity_interval_secs = self.inactivity_interval.as_secs(),
            refresh_interval_secs = self.refresh_interval.as_secs(),
            "Starting session monitor"
        );

        let session = Arc::clone(&self.session);
        handles.push(spawn_ticker(self.inactivity_interval, move || {
            let session = Arc::clone(&session);
            async move {
                if session.check_inactivity().await {
                    debug!("Inactivity check ended the session");
                }
            }
        }));

        let session = Arc::clone(&self.session);
        handles.push(spawn_ticker(self.refresh_interval, move || {
            let session = Arc::clone(&session);
            async move {
                if session.check_expiry().await {
                    debug!("Proactive refresh installed a new credential");
                }
            }
        }));
    }

    pub fn stop(&self) {
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        if !handles.is_empty() {
            info!("Stopping session monitor");
        }
        for handle in handles {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handles.lock().is_empty()
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run `tick` every `period`, first firing one period from now
fn spawn_ticker<F, Fut>(period: Duration, tick: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            tick().await;
        }
    })
}
