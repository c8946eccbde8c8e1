//! # Structured Logging Module
//!
//! Environment-aware structured logging to the console, optionally mirrored as
//! JSON into a log file, plus helpers that keep session and job operation
//! records uniform across the crate.

use chrono::Utc;
use std::fs;
use std::process;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

static LOGGER_INITIALIZED: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize structured logging once per process
///
/// Later calls are no-ops. If the host already installed a global subscriber
/// the existing one is kept.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = config
            .level
            .clone()
            .unwrap_or_else(|| get_log_level(&environment).to_string());

        let console = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(EnvFilter::new(log_level.clone()));

        let mut guard = None;
        let file_layer = if config.json_file {
            match fs::create_dir_all(&config.directory) {
                Ok(()) => {
                    let file_name = format!(
                        "{}.{}.{}.log",
                        environment,
                        process::id(),
                        Utc::now().format("%Y%m%d_%H%M%S")
                    );
                    let appender = tracing_appender::rolling::never(&config.directory, file_name);
                    let (writer, worker_guard) = tracing_appender::non_blocking(appender);
                    guard = Some(worker_guard);
                    Some(
                        fmt::layer()
                            .with_writer(writer)
                            .with_target(true)
                            .with_ansi(false)
                            .json()
                            .with_filter(EnvFilter::new(log_level.clone())),
                    )
                }
                Err(e) => {
                    eprintln!(
                        "slidetrack: cannot create log directory {}: {e}",
                        config.directory.display()
                    );
                    None
                }
            }
        } else {
            None
        };

        if tracing_subscriber::registry()
            .with(console)
            .with(file_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - keeping it");
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            level = %log_level,
            json_file = config.json_file,
            "Structured logging initialized"
        );

        guard
    });
}

fn get_environment() -> String {
    std::env::var("SLIDETRACK_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for session lifecycle operations
pub fn log_session_operation(operation: &str, state: &str, details: Option<&str>) {
    tracing::info!(
        operation = %operation,
        state = %state,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "SESSION_OPERATION"
    );
}

/// Log structured data for tracked job operations
pub fn log_job_operation(operation: &str, job_id: &str, resource_count: usize, status: &str) {
    tracing::info!(
        operation = %operation,
        job_id = %job_id,
        resource_count = resource_count,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "JOB_OPERATION"
    );
}
