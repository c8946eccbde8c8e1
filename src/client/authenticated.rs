//! # Authenticated Request Wrapper
//!
//! Attaches the current credential to outbound requests and recovers from a
//! single unauthorized answer by renewing through the session manager:
//!
//! 1. Transport failures propagate unchanged; nothing is retried here.
//! 2. A 401 triggers exactly one `renew()`. On success the original request
//!    is reissued once and that answer is returned whatever it is. On failure
//!    the session is logged out and the caller gets `Unauthorized`.
//! 3. A successful answer counts as user activity, except on the
//!    [`background`](AuthenticatedClient::background) variant used for
//!    polling.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, SlidetrackError};
use crate::session::SessionManager;
use crate::state_machine::LogoutReason;

use super::transport::{ApiRequest, ApiResponse, HttpTransport};

#[derive(Clone)]
pub struct AuthenticatedClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionManager>,
    tracks_activity: bool,
}

impl fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("transport", &self.transport.transport_name())
            .field("tracks_activity", &self.tracks_activity)
            .finish()
    }
}

impl AuthenticatedClient {
    pub fn new(transport: Arc<dyn HttpTransport>, session: Arc<SessionManager>) -> Self {
        Self {
            transport,
            session,
            tracks_activity: true,
        }
    }

    /// Variant whose successes do not refresh the inactivity clock
    #[must_use]
    pub fn background(&self) -> Self {
        Self {
            tracks_activity: false,
            ..self.clone()
        }
    }

    pub fn tracks_activity(&self) -> bool {
        self.tracks_activity
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.session.ensure_active().await?;

        let mut response = self.issue(&request).await?;

        if response.is_unauthorized() {
            debug!(route = %request.route(), "Unauthorized response; attempting renewal");

            if !self.session.renew().await {
                warn!(route = %request.route(), "Renewal failed; ending session");
                self.session.logout(LogoutReason::Unauthorized).await;
                return Err(SlidetrackError::unauthorized(format!(
                    "{} rejected and renewal failed",
                    request.route()
                )));
            }

            response = self.issue(&request).await?;
        }

        if response.is_success() && self.tracks_activity {
            if let Err(e) = self.session.record_activity().await {
                warn!(error = %e, "Could not record activity");
            }
        }

        Ok(response)
    }

    async fn issue(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut request = request.clone();
        request.bearer = self.session.access_token();
        self.transport.execute(request).await
    }
}
