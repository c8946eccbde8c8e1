use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{AuthenticatedClient, HttpTransport, ImageryApi, ReqwestTransport};
use crate::config::ConfigManager;
use crate::error::{Result, SlidetrackError};
use crate::events::NotificationPublisher;
use crate::orchestration::PollOrchestrator;
use crate::registry::{RecordStatusCache, TaskRegistry};
use crate::session::{Clock, SessionManager, SessionMonitor, SystemClock};
use crate::state_machine::SessionEvent;
use crate::storage::{open_store, KeyValueStore};

/// Shared system dependencies
///
/// Dependency container wiring the durable store, the session manager, the
/// API client, the task registry and the poll orchestrator from one
/// configuration. Session termination stops every poll loop; a later
/// successful authentication resumes them from the registry.
pub struct SystemContext {
    /// System instance ID
    pub system_id: Uuid,

    pub config_manager: Arc<ConfigManager>,

    pub store: Arc<dyn KeyValueStore>,

    pub session: Arc<SessionManager>,

    pub api: ImageryApi,

    pub registry: Arc<TaskRegistry>,

    pub record_cache: RecordStatusCache,

    pub notifications: NotificationPublisher,

    pub orchestrator: PollOrchestrator,

    pub monitor: SessionMonitor,

    session_watch: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl std::fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemContext")
            .field("system_id", &self.system_id)
            .field("config_manager", &"Arc<ConfigManager>")
            .field("store", &"Arc<dyn KeyValueStore>")
            .field("session", &self.session)
            .field("orchestrator", &self.orchestrator)
            .field("monitor", &self.monitor)
            .field("shut_down", &self.shut_down.load(Ordering::Acquire))
            .finish()
    }
}

impl SystemContext {
    /// Create a SystemContext from configuration discovered in the environment
    pub async fn new() -> Result<Self> {
        info!("Initializing SystemContext with auto-detected configuration");
        let config_manager = ConfigManager::load().map_err(|e| {
            SlidetrackError::config_error(format!("Failed to load configuration: {e}"))
        })?;
        Self::from_config(config_manager).await
    }

    /// Create a SystemContext backed by the configured store and a real HTTP transport
    pub async fn from_config(config_manager: Arc<ConfigManager>) -> Result<Self> {
        let config = config_manager.config();
        let transport = Arc::new(ReqwestTransport::new(&config.api)?);
        info!(
            base_url = %transport.base_url(),
            storage = ?config.storage.backend,
            "Initializing SystemContext from configuration"
        );

        let store = open_store(&config.storage).await?;
        Ok(Self::from_parts(
            config_manager,
            transport,
            store,
            Arc::new(SystemClock),
        ))
    }

    /// Assemble the components over explicit collaborators
    pub fn from_parts(
        config_manager: Arc<ConfigManager>,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = config_manager.config().clone();

        let session = Arc::new(SessionManager::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            Arc::clone(&clock),
            config.session.clone(),
        ));
        let api = ImageryApi::new(AuthenticatedClient::new(transport, Arc::clone(&session)));
        let registry = Arc::new(TaskRegistry::new(Arc::clone(&store), clock));
        let notifications = NotificationPublisher::default();
        let orchestrator = PollOrchestrator::new(
            Arc::new(api.clone()),
            Arc::clone(&registry),
            notifications.clone(),
            &config.polling,
        );
        let monitor = SessionMonitor::new(Arc::clone(&session), &config.session);

        Self {
            system_id: Uuid::new_v4(),
            config_manager,
            record_cache: RecordStatusCache::new(Arc::clone(&store)),
            store,
            session,
            api,
            registry,
            notifications,
            orchestrator,
            monitor,
            session_watch: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Rehydrate the session, resume tracked jobs and start the monitors
    ///
    /// Returns whether the session ended up authenticated. Tracked jobs are
    /// only resumed for an authenticated session; otherwise they wait for
    /// the next successful login.
    pub async fn start(&self) -> Result<bool> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(SlidetrackError::Orchestration(
                "SystemContext is shut down".to_string(),
            ));
        }

        self.watch_session();
        let authenticated = self.session.bootstrap().await;
        if authenticated {
            self.orchestrator.resume().await?;
        }
        self.monitor.start();

        info!(
            system_id = %self.system_id,
            authenticated = authenticated,
            active_jobs = self.orchestrator.active_jobs().len(),
            "SystemContext started"
        );
        Ok(authenticated)
    }

    /// Couple poll loops to the session lifecycle
    fn watch_session(&self) {
        let mut watch = self.session_watch.lock();
        if watch.is_some() {
            return;
        }

        let mut events = self.session.subscribe();
        let orchestrator = self.orchestrator.clone();
        *watch = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::Terminated(reason)) => {
                        let stopped = orchestrator.stop_all();
                        info!(reason = %reason, stopped = stopped, "Session terminated; polling paused");
                    }
                    Ok(SessionEvent::AuthenticationSucceeded) => {
                        if let Err(e) = orchestrator.reconcile().await {
                            warn!(error = %e, "Could not resume tracked jobs after authentication");
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped = skipped, "Session event watcher lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Lifecycle teardown; later calls do nothing
    pub async fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            debug!("SystemContext already shut down");
            return Ok(());
        }

        if let Some(handle) = self.session_watch.lock().take() {
            handle.abort();
        }
        self.monitor.stop();
        let result = self.orchestrator.shutdown().await;

        info!(system_id = %self.system_id, "SystemContext shut down");
        result
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::ApiResponse;
    use crate::config::ClientConfig;
    use crate::storage::MemoryStore;
    use crate::test_helpers::{ManualClock, ScriptedTransport};
    use serde_json::json;

    fn context(transport: Arc<ScriptedTransport>) -> SystemContext {
        let manager = ConfigManager::from_config(ClientConfig::default()).unwrap();
        SystemContext::from_parts(
            manager,
            transport,
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::default()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_refresh_cookie_stays_unauthenticated() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push("POST /refresh", ApiResponse::new(401, ""));
        let context = context(transport);

        assert!(!context.start().await.unwrap());
        assert!(!context.session.is_authenticated());
        assert!(context.monitor.is_running());

        context.shutdown().await.unwrap();
        context.shutdown().await.unwrap();
        assert!(!context.monitor.is_running());
        assert!(context.start().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_resumes_registered_jobs() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            "POST /refresh",
            ApiResponse::json_body(200, &json!({"access_token": "tok", "expires_in": 900})),
        );
        let context = context(transport);
        context
            .registry
            .add("t1", vec!["a.tiff".to_string()])
            .await
            .unwrap();

        assert!(context.start().await.unwrap());
        assert_eq!(context.orchestrator.active_jobs(), vec!["t1"]);

        context.shutdown().await.unwrap();
        assert!(context.orchestrator.active_jobs().is_empty());
    }
}
