//! # Session Manager
//!
//! Exclusive owner of the in-memory credential, its expiry and the
//! inactivity clock. Other components read the credential through
//! [`SessionManager::access_token`] and ask for renewal through
//! [`SessionManager::renew`]; nothing else mutates it.
//!
//! Lock order is state machine, then credential. Neither lock is held across
//! an `.await`.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::client::transport::{ApiRequest, HttpTransport};
use crate::config::SessionConfig;
use crate::constants::{defaults, endpoints, storage_keys};
use crate::error::{Result, SlidetrackError};
use crate::logging::log_session_operation;
use crate::models::{RefreshResponse, TokenResponse};
use crate::state_machine::{LogoutReason, SessionEvent, SessionState, SessionStateMachine};
use crate::storage::{KeyValueStore, KeyValueStoreExt};

use super::activity::{decode_last_activity, encode_last_activity, InteractionSignal};
use super::clock::Clock;
use super::credential::{self, Credential};

pub struct SessionManager {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    state: Mutex<SessionStateMachine>,
    credential: RwLock<Option<Credential>>,
    /// Bumped whenever the credential is installed or cleared
    generation: AtomicU64,
    last_activity: RwLock<Option<DateTime<Utc>>>,
    location: RwLock<Option<String>>,
    renewal: tokio::sync::Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("has_credential", &self.credential.read().is_some())
            .field("last_activity", &*self.last_activity.read())
            .finish()
    }
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(defaults::NOTIFICATION_CAPACITY);
        Self {
            transport,
            store,
            clock,
            config,
            state: Mutex::new(SessionStateMachine::new()),
            credential: RwLock::new(None),
            generation: AtomicU64::new(0),
            last_activity: RwLock::new(None),
            location: RwLock::new(None),
            renewal: tokio::sync::Mutex::new(()),
            events,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().current_state()
    }

    /// Subscribe to session lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Current bearer token, if one is held
    pub fn access_token(&self) -> Option<String> {
        self.credential.read().as_ref().map(|c| c.token().to_string())
    }

    pub fn credential_expires_at(&self) -> Option<DateTime<Utc>> {
        self.credential.read().as_ref().map(Credential::expires_at)
    }

    /// True when no credential is held or it expires within `margin`
    pub fn is_expiring_soon(&self, margin: Duration) -> bool {
        credential::is_expiring_soon(self.credential.read().as_ref(), self.clock.now(), margin)
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        *self.last_activity.read()
    }

    /// A credential is held and the inactivity timeout has not elapsed
    pub fn is_authenticated(&self) -> bool {
        self.state().permits_requests()
            && self.credential.read().is_some()
            && !self.is_idle_expired(self.clock.now())
    }

    fn is_idle_expired(&self, now: DateTime<Utc>) -> bool {
        let timeout = TimeDelta::from_std(self.config.inactivity_timeout())
            .unwrap_or_else(|_| TimeDelta::max_value());
        self.last_activity
            .read()
            .is_some_and(|at| now.signed_duration_since(at) >= timeout)
    }

    // =========================================================================
    // RENEWAL
    // =========================================================================

    /// Run the refresh exchange and install the resulting credential
    ///
    /// Never fails: transport errors and rejections collapse to `false`.
    /// Concurrent callers are serialized; a caller that waited while another
    /// renewal completed reuses that outcome instead of renewing again.
    pub async fn renew(&self) -> bool {
        let observed = self.generation.load(Ordering::Acquire);
        let _guard = self.renewal.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            debug!("Renewal completed while waiting; reusing its outcome");
            return self.credential.read().is_some();
        }

        self.transition(SessionEvent::AuthenticationStarted);

        match self.exchange_refresh().await {
            Ok(credential) => self.finish_authentication(Some(credential)),
            Err(e) => {
                warn!(error = %e, "Credential renewal failed");
                self.finish_authentication(None)
            }
        }
    }

    async fn exchange_refresh(&self) -> Result<Credential> {
        let response = self
            .transport
            .execute(ApiRequest::post(endpoints::REFRESH))
            .await?;
        let body: RefreshResponse = response.into_json()?;
        let ttl = body
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.config.default_token_ttl());
        Ok(Credential::issued(body.access_token, self.clock.now(), ttl))
    }

    /// Settle an in-flight authentication exchange
    ///
    /// If the session left `Authenticating` meanwhile (logout raced the
    /// exchange) the result is discarded.
    fn finish_authentication(&self, outcome: Option<Credential>) -> bool {
        let now = self.clock.now();
        let mut machine = self.state.lock();
        if machine.current_state() != SessionState::Authenticating {
            debug!(
                state = %machine.current_state(),
                "Session changed during authentication; discarding result"
            );
            return false;
        }

        let succeeded = outcome.is_some();
        let event = if succeeded {
            SessionEvent::AuthenticationSucceeded
        } else {
            SessionEvent::AuthenticationFailed
        };

        *self.credential.write() = outcome;
        self.generation.fetch_add(1, Ordering::AcqRel);
        let result = machine.transition(event, now);
        drop(machine);

        if let Ok(state) = result {
            self.publish(event, state);
        }
        succeeded
    }

    /// Direct login against `POST /token`
    ///
    /// The endpoint reports no expiry, so the configured default TTL is used.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let _guard = self.renewal.lock().await;
        self.transition(SessionEvent::AuthenticationStarted);

        let request = ApiRequest::post(endpoints::TOKEN).with_form(vec![
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ]);

        let token = match self.exchange_login(request).await {
            Ok(token) => token,
            Err(e) => {
                self.finish_authentication(None);
                return Err(e);
            }
        };

        let credential =
            Credential::issued(token.access_token, self.clock.now(), self.config.default_token_ttl());
        if !self.finish_authentication(Some(credential)) {
            return Err(SlidetrackError::unauthorized("Session ended during login"));
        }

        info!(username = %username, "Logged in");
        self.store
            .set(storage_keys::IS_AUTHENTICATED, Value::Bool(true))
            .await?;
        self.record_activity().await
    }

    async fn exchange_login(&self, request: ApiRequest) -> Result<TokenResponse> {
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            debug!(status = response.status, "Login rejected");
            return Err(SlidetrackError::unauthorized("Invalid credentials"));
        }
        response.json()
    }

    /// Startup rehydration
    ///
    /// The credential is never read from storage; it is recovered through the
    /// refresh exchange unless the durable activity record shows the session
    /// already idled out.
    pub async fn bootstrap(&self) -> bool {
        let now = self.clock.now();
        let stored = match self.store.get(storage_keys::LAST_ACTIVITY).await {
            Ok(value) => value.as_ref().and_then(decode_last_activity),
            Err(e) => {
                warn!(error = %e, "Could not read last activity");
                None
            }
        };
        *self.last_activity.write() = Some(stored.unwrap_or(now));

        if self.is_idle_expired(now) {
            info!("Stored session idled out; staying logged out");
            *self.last_activity.write() = None;
            self.clear_session_keys().await;
            log_session_operation("bootstrap", &self.state().to_string(), Some("idle_expired"));
            return false;
        }

        let renewed = self.renew().await;
        if renewed {
            if let Err(e) = self
                .store
                .set(storage_keys::IS_AUTHENTICATED, Value::Bool(true))
                .await
            {
                warn!(error = %e, "Could not persist authenticated flag");
            }
            if let Some(at) = self.last_activity() {
                if let Err(e) = self
                    .store
                    .set(storage_keys::LAST_ACTIVITY, encode_last_activity(at))
                    .await
                {
                    warn!(error = %e, "Could not persist last activity");
                }
            }
        }
        log_session_operation("bootstrap", &self.state().to_string(), None);
        renewed
    }

    // =========================================================================
    // ACTIVITY AND PERIODIC CHECKS
    // =========================================================================

    /// Mark the user as active now
    pub async fn record_activity(&self) -> Result<()> {
        let now = self.clock.now();
        *self.last_activity.write() = Some(now);
        self.store
            .set(storage_keys::LAST_ACTIVITY, encode_last_activity(now))
            .await
    }

    pub async fn on_interaction(&self, signal: InteractionSignal) -> Result<()> {
        if !signal.counts_as_activity() {
            return Ok(());
        }
        self.record_activity().await
    }

    /// Inactivity check body; returns true if it forced a logout
    pub async fn check_inactivity(&self) -> bool {
        if !self.state().permits_requests() {
            return false;
        }
        if !self.is_idle_expired(self.clock.now()) {
            return false;
        }

        info!(
            timeout_secs = self.config.inactivity_timeout_secs,
            "Inactivity timeout elapsed"
        );
        self.logout(LogoutReason::Inactivity).await;
        true
    }

    /// Proactive refresh check body; returns true if a renewal ran and succeeded
    pub async fn check_expiry(&self) -> bool {
        if !self.state().holds_credential() {
            return false;
        }
        if !self.is_expiring_soon(self.config.refresh_margin()) {
            return false;
        }

        self.transition(SessionEvent::ExpiryApproaching);
        self.renew().await
    }

    /// Guard for authenticated calls
    ///
    /// Refuses when no session is established. A session that idled out is
    /// logged out here rather than waiting for the next periodic check.
    pub async fn ensure_active(&self) -> Result<()> {
        if !self.state().permits_requests() {
            return Err(SlidetrackError::unauthorized("Session is not authenticated"));
        }
        if self.is_idle_expired(self.clock.now()) {
            self.logout(LogoutReason::Inactivity).await;
            return Err(SlidetrackError::unauthorized(
                "Session expired due to inactivity",
            ));
        }
        Ok(())
    }

    // =========================================================================
    // LOGOUT AND RETURN PATH
    // =========================================================================

    /// Report the host's current navigational location
    pub fn set_location(&self, path: impl Into<String>) {
        *self.location.write() = Some(path.into());
    }

    /// Consume the location saved by the last forced logout
    pub async fn take_return_path(&self) -> Result<Option<String>> {
        let path: Option<String> = self.store.get_as(storage_keys::LOGIN_REDIRECT).await?;
        if path.is_some() {
            self.store.remove(storage_keys::LOGIN_REDIRECT).await?;
        }
        Ok(path)
    }

    /// End the session
    ///
    /// Storage failures are logged, not returned: logout always completes
    /// locally.
    pub async fn logout(&self, reason: LogoutReason) {
        let event = SessionEvent::Terminated(reason);
        let state = {
            let mut machine = self.state.lock();
            let result = machine.transition(event, self.clock.now());
            *self.credential.write() = None;
            self.generation.fetch_add(1, Ordering::AcqRel);
            result.unwrap_or_else(|_| machine.current_state())
        };
        *self.last_activity.write() = None;
        self.publish(event, state);

        if reason.preserves_location() {
            let location = self.location.read().clone();
            if let Some(path) = location {
                if let Err(e) = self
                    .store
                    .set(storage_keys::LOGIN_REDIRECT, Value::String(path))
                    .await
                {
                    warn!(error = %e, "Could not save return path");
                }
            }
        }

        self.clear_session_keys().await;

        match self.transport.execute(ApiRequest::post(endpoints::LOGOUT)).await {
            Ok(response) if response.is_success() => debug!("Server session revoked"),
            Ok(response) => debug!(status = response.status, "Logout endpoint declined"),
            Err(e) => debug!(error = %e, "Logout endpoint unreachable"),
        }
    }

    async fn clear_session_keys(&self) {
        for key in [storage_keys::IS_AUTHENTICATED, storage_keys::LAST_ACTIVITY] {
            if let Err(e) = self.store.remove(key).await {
                warn!(key = key, error = %e, "Could not clear session key");
            }
        }
    }

    fn transition(&self, event: SessionEvent) -> Option<SessionState> {
        let result = self.state.lock().transition(event, self.clock.now());
        match result {
            Ok(state) => {
                self.publish(event, state);
                Some(state)
            }
            Err(e) => {
                debug!(error = %e, "Session event ignored");
                None
            }
        }
    }

    fn publish(&self, event: SessionEvent, state: SessionState) {
        let reason = event.logout_reason().map(|r| r.to_string());
        log_session_operation(event.event_type(), &state.to_string(), reason.as_deref());
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
