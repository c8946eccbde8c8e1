//! # Error Types
//!
//! Unified error handling for the session and task-orchestration core.
//!
//! The variants follow the failure taxonomy the client reasons about:
//! transport failures never reached the backend, unauthorized responses end in
//! renewal or logout, validation failures are reported to the user, and remote
//! failures are non-2xx answers that callers (and poll loops) treat as transient.

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, SlidetrackError>;

#[derive(Debug, Error)]
pub enum SlidetrackError {
    /// No response reached the backend (DNS, connection refused, timeout)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The backend rejected the credential and renewal could not recover it
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller input was rejected before anything was sent
    #[error("Validation failure: {0}")]
    Validation(String),

    /// Non-2xx, non-401 response
    #[error("Remote failure: HTTP {status} - {message}")]
    Remote { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Orchestration error: {0}")]
    Orchestration(String),
}

impl SlidetrackError {
    /// Create a remote error from an HTTP status and body text
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if the error is worth retrying on the next poll cadence
    ///
    /// Unauthorized is never recoverable at this layer: the request wrapper has
    /// already spent its single renewal attempt by the time it surfaces.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            SlidetrackError::Transport(_) => true,
            SlidetrackError::Remote { .. } => true,
            // A malformed body on one tick says nothing about the next one
            SlidetrackError::Serialization(_) => true,
            SlidetrackError::Storage(_) => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SlidetrackError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for SlidetrackError {
    fn from(err: reqwest::Error) -> Self {
        SlidetrackError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for SlidetrackError {
    fn from(err: std::io::Error) -> Self {
        SlidetrackError::Storage(err.to_string())
    }
}

impl From<config::ConfigError> for SlidetrackError {
    fn from(err: config::ConfigError) -> Self {
        SlidetrackError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(SlidetrackError::Transport("connection refused".into()).is_recoverable());
        assert!(SlidetrackError::remote(502, "bad gateway").is_recoverable());
        assert!(!SlidetrackError::unauthorized("expired").is_recoverable());
        assert!(!SlidetrackError::validation("empty selection").is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = SlidetrackError::remote(404, "not found");
        assert_eq!(err.to_string(), "Remote failure: HTTP 404 - not found");
        assert!(SlidetrackError::unauthorized("x").is_unauthorized());
    }
}
