use serde::{Deserialize, Serialize};
use std::fmt;

/// Session state definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No usable credential; authenticated calls are refused
    #[default]
    Unauthenticated,
    /// A renewal or login exchange is in flight
    Authenticating,
    /// A credential is held and not yet near expiry
    Authenticated,
    /// A credential is held but within the refresh margin
    Expiring,
}

impl SessionState {
    /// Check if a credential is expected to be held in this state
    pub fn holds_credential(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Expiring)
    }

    /// Check if authenticated calls may be issued in this state
    ///
    /// Calls keep flowing while a renewal is in flight; they carry whichever
    /// credential is current when they are sent.
    pub fn permits_requests(&self) -> bool {
        !matches!(self, Self::Unauthenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Expiring => write!(f, "expiring"),
        }
    }
}

impl std::str::FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unauthenticated" => Ok(Self::Unauthenticated),
            "authenticating" => Ok(Self::Authenticating),
            "authenticated" => Ok(Self::Authenticated),
            "expiring" => Ok(Self::Expiring),
            _ => Err(format!("Invalid session state: {s}")),
        }
    }
}
