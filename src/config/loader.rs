//! Configuration Loader
//!
//! Environment-aware configuration loading on top of the `config` crate.
//! Layering (lowest to highest precedence): built-in defaults, the first
//! `slidetrack.toml` found, then `SLIDETRACK__SECTION__KEY` variables.

use super::ClientConfig;
use crate::error::Result;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const ENV_PREFIX: &str = "SLIDETRACK";
const ENV_SEPARATOR: &str = "__";
const CONFIG_FILE_NAME: &str = "slidetrack.toml";

/// Loaded configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: ClientConfig,
    environment: String,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection and file discovery
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from_file(Self::find_config_file().as_deref())
    }

    /// Load configuration layered over a specific file (or none)
    pub fn load_from_file(path: Option<&Path>) -> Result<Arc<ConfigManager>> {
        let environment = Self::detect_environment();

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&ClientConfig::default())?);

        if let Some(path) = path {
            debug!(path = %path.display(), "Layering configuration file");
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config: ClientConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            "Configuration loaded: {}",
            serde_json::to_string_pretty(&Self::sanitize_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );
        info!(
            environment = %environment,
            base_url = %config.api.base_url,
            poll_interval_ms = config.polling.interval_ms,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            source_file: path.map(Path::to_path_buf),
        }))
    }

    /// Wrap an already-built configuration (tests, embedding hosts)
    pub fn from_config(config: ClientConfig) -> Result<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            source_file: None,
        }))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Configuration as JSON with secret-looking fields masked
    pub fn sanitized(&self) -> serde_json::Value {
        Self::sanitize_for_logging(&self.config)
    }

    pub(crate) fn detect_environment() -> String {
        env::var("SLIDETRACK_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn find_config_file() -> Option<PathBuf> {
        let mut candidates = vec![
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("config").join(CONFIG_FILE_NAME),
        ];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("slidetrack").join(CONFIG_FILE_NAME));
        }

        candidates.into_iter().find(|p| p.is_file())
    }

    fn sanitize_for_logging(config: &ClientConfig) -> serde_json::Value {
        let mut value = serde_json::to_value(config).unwrap_or(serde_json::Value::Null);
        Self::sanitize_json_recursive(&mut value, &["password", "secret", "token", "key"]);
        value
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern))
                        // durations and sizes are not secrets
                        && !key_lower.ends_with("_secs")
                        && !key_lower.ends_with("_ms");

                    if is_sensitive && !val.is_object() {
                        *val = serde_json::Value::String("[MASKED]".to_string());
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"https://imaging.example.org\"\n\n[polling]\ninterval_ms = 2500\n"
        )
        .unwrap();

        let manager = ConfigManager::load_from_file(Some(file.path())).unwrap();
        assert_eq!(manager.config().api.base_url, "https://imaging.example.org");
        assert_eq!(manager.config().polling.interval_ms, 2500);
        // untouched sections keep their defaults
        assert_eq!(manager.config().session.refresh_margin_secs, 120);
        assert_eq!(manager.source_file(), Some(file.path()));
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let mut file: NamedTempFile = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[polling]\ninterval_ms = 0\n").unwrap();

        assert!(ConfigManager::load_from_file(Some(file.path())).is_err());
    }

    #[test]
    fn test_sanitize_masks_secret_like_values() {
        let mut value = serde_json::json!({
            "api": { "token": "abcdef", "timeout_ms": 10 },
            "session": { "refresh_margin_secs": 120 }
        });
        ConfigManager::sanitize_json_recursive(&mut value, &["token", "secret"]);
        assert_eq!(value["api"]["token"], "[MASKED]");
        assert_eq!(value["api"]["timeout_ms"], 10);
        assert_eq!(value["session"]["refresh_margin_secs"], 120);
    }
}
