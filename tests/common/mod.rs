//! Shared fixtures for the integration suite
#![allow(dead_code)]

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use slidetrack_core::client::{ApiResponse, AuthenticatedClient, ImageryApi};
use slidetrack_core::config::{PollingConfig, SessionConfig};
use slidetrack_core::events::{Notification, NotificationPublisher};
use slidetrack_core::orchestration::PollOrchestrator;
use slidetrack_core::registry::TaskRegistry;
use slidetrack_core::session::SessionManager;
use slidetrack_core::storage::{KeyValueStore, MemoryStore};
use slidetrack_core::test_helpers::{ManualClock, ScriptedBackend, ScriptedTransport};

/// Default status poll cadence
pub const POLL: Duration = Duration::from_secs(5);

/// Orchestrator over a scripted backend
pub struct OrchestrationHarness {
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<MemoryStore>,
    pub registry: Arc<TaskRegistry>,
    pub orchestrator: PollOrchestrator,
    pub notifications: broadcast::Receiver<Notification>,
}

pub fn orchestration_harness() -> OrchestrationHarness {
    orchestration_harness_over(Arc::new(MemoryStore::new()), Arc::new(ScriptedBackend::new()))
}

/// Harness sharing a store with an earlier one, as a restarted process would
pub fn orchestration_harness_over(
    store: Arc<MemoryStore>,
    backend: Arc<ScriptedBackend>,
) -> OrchestrationHarness {
    let registry = Arc::new(TaskRegistry::new(
        store.clone(),
        Arc::new(ManualClock::default()),
    ));
    let publisher = NotificationPublisher::default();
    let notifications = publisher.subscribe();
    let orchestrator = PollOrchestrator::new(
        backend.clone(),
        registry.clone(),
        publisher,
        &PollingConfig::default(),
    );
    OrchestrationHarness {
        backend,
        store,
        registry,
        orchestrator,
        notifications,
    }
}

/// Session, API and orchestrator over a scripted HTTP transport
pub struct StackHarness {
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub session: Arc<SessionManager>,
    pub api: ImageryApi,
    pub orchestrator: PollOrchestrator,
    pub notifications: broadcast::Receiver<Notification>,
}

pub fn stack() -> StackHarness {
    let transport = Arc::new(ScriptedTransport::new());
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::default());
    let session = Arc::new(SessionManager::new(
        transport.clone(),
        store.clone(),
        clock.clone(),
        SessionConfig::default(),
    ));
    let api = ImageryApi::new(AuthenticatedClient::new(transport.clone(), session.clone()));
    let registry = Arc::new(TaskRegistry::new(store.clone(), clock.clone()));
    let publisher = NotificationPublisher::default();
    let notifications = publisher.subscribe();
    let orchestrator = PollOrchestrator::new(
        Arc::new(api.clone()),
        registry,
        publisher,
        &PollingConfig::default(),
    );
    StackHarness {
        transport,
        store,
        clock,
        session,
        api,
        orchestrator,
        notifications,
    }
}

/// Stack with a session already holding `token`; recorded requests are cleared
pub async fn authenticated_stack(token: &str) -> StackHarness {
    let harness = stack();
    harness.transport.push("POST /refresh", refresh_ok(token, 900));
    assert!(harness.session.renew().await);
    harness.session.record_activity().await.unwrap();
    harness.transport.clear_requests();
    harness
}

pub fn refresh_ok(token: &str, expires_in: u64) -> ApiResponse {
    ApiResponse::json_body(200, &json!({"access_token": token, "expires_in": expires_in}))
}

pub fn task_status(job_id: &str, status: &str) -> ApiResponse {
    ApiResponse::json_body(200, &json!({"status": status, "task_id": job_id}))
}

/// Everything published so far
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut received = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        received.push(notification);
    }
    received
}

pub fn messages(notifications: &[Notification]) -> Vec<String> {
    notifications.iter().map(|n| n.message.clone()).collect()
}

pub async fn stored_keys(store: &MemoryStore, keys: &[&str]) -> Vec<bool> {
    let mut present = Vec::new();
    for key in keys {
        present.push(store.get(key).await.unwrap().is_some());
    }
    present
}
