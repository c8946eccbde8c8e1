use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a session was terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The user asked to log out
    UserInitiated,
    /// The inactivity timeout elapsed
    Inactivity,
    /// A request was rejected and renewal could not recover
    Unauthorized,
}

impl LogoutReason {
    /// Forced terminations remember where the user was so login can return there
    pub fn preserves_location(&self) -> bool {
        !matches!(self, Self::UserInitiated)
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserInitiated => write!(f, "user_initiated"),
            Self::Inactivity => write!(f, "inactivity"),
            Self::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

/// Events that can trigger session state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    /// A renewal or login exchange started
    AuthenticationStarted,
    /// The exchange produced a fresh credential
    AuthenticationSucceeded,
    /// The exchange failed or was rejected
    AuthenticationFailed,
    /// The background check found the credential within the refresh margin
    ExpiryApproaching,
    /// The session ended
    Terminated(LogoutReason),
}

impl SessionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AuthenticationStarted => "authentication_started",
            Self::AuthenticationSucceeded => "authentication_succeeded",
            Self::AuthenticationFailed => "authentication_failed",
            Self::ExpiryApproaching => "expiry_approaching",
            Self::Terminated(_) => "terminated",
        }
    }

    pub fn logout_reason(&self) -> Option<LogoutReason> {
        match self {
            Self::Terminated(reason) => Some(*reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_forced_logouts_preserve_location() {
        assert!(!LogoutReason::UserInitiated.preserves_location());
        assert!(LogoutReason::Inactivity.preserves_location());
        assert!(LogoutReason::Unauthorized.preserves_location());
    }

    #[test]
    fn test_event_serde_shape() {
        let event = SessionEvent::Terminated(LogoutReason::Inactivity);
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Terminated", "data": "inactivity"}));
        assert_eq!(event.logout_reason(), Some(LogoutReason::Inactivity));
        assert_eq!(SessionEvent::ExpiryApproaching.event_type(), "expiry_approaching");
    }
}
