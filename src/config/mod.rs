//! # Client Configuration
//!
//! Configuration for the session and orchestration core. Values come from
//! built-in defaults, an optional `slidetrack.toml`, and `SLIDETRACK__*`
//! environment variables, in increasing order of precedence.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use slidetrack_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let poll_every = manager.config().polling.interval();
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::defaults;
use crate::error::{Result, SlidetrackError};

pub use loader::ConfigManager;

/// Root configuration structure mirroring slidetrack.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend API connection settings
    pub api: ApiConfig,
    /// Credential renewal and inactivity settings
    pub session: SessionConfig,
    /// Job status polling settings
    pub polling: PollingConfig,
    /// Durable key-value store backing
    pub storage: StorageConfig,
    /// Log output settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend origin (e.g., "<http://localhost:8000>")
    pub base_url: String,
    /// Path prefix every endpoint lives under
    pub api_prefix: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "/ikem_api".to_string(),
            timeout_ms: defaults::REQUEST_TIMEOUT.as_millis() as u64,
            user_agent: format!("slidetrack/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Renew this long before the credential expires
    pub refresh_margin_secs: u64,
    /// Idle time after which the session is terminated
    pub inactivity_timeout_secs: u64,
    pub inactivity_check_interval_secs: u64,
    pub refresh_check_interval_secs: u64,
    /// Credential lifetime assumed when the backend does not state one
    pub default_token_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_margin_secs: defaults::REFRESH_MARGIN.as_secs(),
            inactivity_timeout_secs: defaults::INACTIVITY_TIMEOUT.as_secs(),
            inactivity_check_interval_secs: defaults::INACTIVITY_CHECK_INTERVAL.as_secs(),
            refresh_check_interval_secs: defaults::REFRESH_CHECK_INTERVAL.as_secs(),
            default_token_ttl_secs: defaults::TOKEN_TTL.as_secs(),
        }
    }
}

impl SessionConfig {
    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn inactivity_check_interval(&self) -> Duration {
        Duration::from_secs(self.inactivity_check_interval_secs)
    }

    pub fn refresh_check_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_check_interval_secs)
    }

    pub fn default_token_ttl(&self) -> Duration {
        Duration::from_secs(self.default_token_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Cadence of each job's status poll
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-lifetime store, lost on exit
    Memory,
    /// JSON document on disk, survives restarts
    #[default]
    File,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Location of the file store; defaults under the user data directory
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the file store location
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("slidetrack")
                .join("store.json")
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Explicit filter directive; when unset the environment decides
    pub level: Option<String>,
    /// Also write JSON logs to a file under `directory`
    pub json_file: bool,
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            json_file: false,
            directory: PathBuf::from("log"),
        }
    }
}

impl ClientConfig {
    /// Reject configurations the runtime cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(SlidetrackError::config_error("api.base_url must not be empty"));
        }
        if reqwest::Url::parse(&self.api.base_url).is_err() {
            return Err(SlidetrackError::config_error(format!(
                "api.base_url is not a valid URL: {}",
                self.api.base_url
            )));
        }
        if self.api.timeout_ms == 0 {
            return Err(SlidetrackError::config_error("api.timeout_ms must be positive"));
        }
        if self.polling.interval_ms == 0 {
            return Err(SlidetrackError::config_error(
                "polling.interval_ms must be positive",
            ));
        }
        if self.session.inactivity_check_interval_secs == 0
            || self.session.refresh_check_interval_secs == 0
        {
            return Err(SlidetrackError::config_error(
                "session check intervals must be positive",
            ));
        }
        if self.session.inactivity_timeout_secs == 0 {
            return Err(SlidetrackError::config_error(
                "session.inactivity_timeout_secs must be positive",
            ));
        }
        if self.session.refresh_margin_secs >= self.session.default_token_ttl_secs {
            return Err(SlidetrackError::config_error(format!(
                "session.refresh_margin_secs ({}) must be shorter than default_token_ttl_secs ({})",
                self.session.refresh_margin_secs, self.session.default_token_ttl_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.polling.interval(), Duration::from_secs(5));
        assert_eq!(config.session.refresh_margin(), Duration::from_secs(120));
        assert_eq!(config.session.inactivity_timeout(), Duration::from_secs(1800));
        assert_eq!(config.api.api_prefix, "/ikem_api");
    }

    #[test]
    fn test_validation_rejects_margin_longer_than_ttl() {
        let mut config = ClientConfig::default();
        config.session.refresh_margin_secs = 900;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SlidetrackError::Configuration(_)));
    }

    #[test]
    fn test_validation_rejects_zero_poll_interval() {
        let mut config = ClientConfig::default();
        config.polling.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_url() {
        let mut config = ClientConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_storage_path_wins() {
        let storage = StorageConfig {
            backend: StorageBackend::File,
            path: Some(PathBuf::from("/tmp/slidetrack.json")),
        };
        assert_eq!(storage.resolved_path(), PathBuf::from("/tmp/slidetrack.json"));
    }
}
