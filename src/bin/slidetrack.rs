//! # Slidetrack CLI
//!
//! Command-line host for the session and orchestration core: log in, list
//! slide files with their processing status, submit files for structure
//! prediction and follow tracked jobs until they finish.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{info, warn};

use slidetrack_core::config::ConfigManager;
use slidetrack_core::events::{Notification, NotificationKind};
use slidetrack_core::logging::init_structured_logging;
use slidetrack_core::models::ResourceRecord;
use slidetrack_core::SystemContext;

#[derive(Parser, Debug)]
#[command(name = "slidetrack")]
#[command(about = "Track slide processing jobs against the imagery backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path (default: discovered slidetrack.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log in with this user when no session can be resumed
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Verify credentials against the backend
    Login,
    /// List slide files and their processing status
    Files {
        /// Maximum number of files to list
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Submit files for processing and follow them to completion
    Submit {
        /// File ids as listed by `files`
        #[arg(value_name = "FILE_ID", required = true)]
        ids: Vec<String>,
    },
    /// Follow every tracked job until all have finished
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let manager = ConfigManager::load_from_file(cli.config.as_deref())
        .context("failed to load configuration")?;
    let mut logging = manager.config().logging.clone();
    if logging.level.is_none() {
        logging.level = match cli.verbose {
            0 => None,
            1 => Some("info".to_string()),
            2 => Some("debug".to_string()),
            _ => Some("trace".to_string()),
        };
    }
    init_structured_logging(&logging);

    let context = SystemContext::from_config(manager)
        .await
        .context("failed to initialize")?;

    let outcome = tokio::select! {
        result = run(&context, &cli) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            Ok(())
        }
    };

    context.shutdown().await.context("shutdown failed")?;
    outcome
}

async fn run(context: &SystemContext, cli: &Cli) -> anyhow::Result<()> {
    let mut authenticated = context.start().await?;
    if !authenticated {
        if let Some(username) = &cli.username {
            let password = std::env::var("SLIDETRACK_PASSWORD")
                .context("SLIDETRACK_PASSWORD must be set to log in")?;
            context.session.login(username, &password).await?;
            authenticated = true;
        }
    }

    if matches!(cli.command, Commands::Login) {
        if !authenticated {
            bail!("not logged in; pass --username and set SLIDETRACK_PASSWORD");
        }
        println!("Logged in");
        if let Some(path) = context.session.take_return_path().await? {
            println!("Return to: {path}");
        }
        return Ok(());
    }

    if !authenticated {
        bail!("session could not be resumed; pass --username to log in");
    }

    match &cli.command {
        Commands::Login => Ok(()),
        Commands::Files { limit } => list_files(context, *limit).await,
        Commands::Submit { ids } => submit_and_follow(context, ids.clone()).await.map(|_| ()),
        Commands::Watch => {
            let notifications = context.notifications.subscribe();
            context.orchestrator.resume().await?;
            follow(context, notifications).await.map(|_| ())
        }
    }
}

async fn submit_and_follow(context: &SystemContext, ids: Vec<String>) -> anyhow::Result<usize> {
    let notifications = context.notifications.subscribe();
    let job = context.orchestrator.submit(ids).await?;
    println!("Submitted job {} for {} file(s)", job.job_id, job.resource_ids.len());
    follow(context, notifications).await
}

async fn list_files(context: &SystemContext, limit: Option<u32>) -> anyhow::Result<()> {
    let listing = context.api.list_tiff_files(limit).await?;
    let board = context.orchestrator.board();
    let records: Vec<ResourceRecord> = listing.tiff_files.iter().map(|f| board.project(f)).collect();

    if let Err(e) = context.record_cache.store(&records).await {
        warn!(error = %e, "Could not cache record statuses");
    }

    for record in &records {
        println!(
            "{:<40} {:<20} {:>10} {:<10} {}",
            record.name,
            record.date,
            record.size,
            record.status,
            record.task_id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Print notifications until no job is being polled
///
/// Returns how many were printed.
async fn follow(
    context: &SystemContext,
    mut notifications: broadcast::Receiver<Notification>,
) -> anyhow::Result<usize> {
    let mut idle_check = tokio::time::interval(Duration::from_secs(1));
    let mut printed = 0;

    loop {
        tokio::select! {
            received = notifications.recv() => match received {
                Ok(notification) => {
                    print_notification(&notification);
                    printed += 1;
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped = skipped, "Missed notifications"),
                Err(RecvError::Closed) => break,
            },
            _ = idle_check.tick() => {
                if context.orchestrator.active_jobs().is_empty() {
                    printed += print_pending(&mut notifications);
                    break;
                }
                if !context.session.is_authenticated() {
                    print_pending(&mut notifications);
                    bail!("session ended while jobs were still running");
                }
            }
        }
    }
    Ok(printed)
}

/// Print whatever is already queued without waiting
fn print_pending(notifications: &mut broadcast::Receiver<Notification>) -> usize {
    let mut printed = 0;
    loop {
        match notifications.try_recv() {
            Ok(notification) => {
                print_notification(&notification);
                printed += 1;
            }
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped = skipped, "Missed notifications"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return printed,
        }
    }
}

fn print_notification(notification: &Notification) {
    let marker = match notification.kind {
        NotificationKind::Success => "ok",
        NotificationKind::Error => "!!",
        NotificationKind::Info => "--",
    };
    println!(
        "[{}] {} {}",
        notification.timestamp.format("%H:%M:%S"),
        marker,
        notification.message
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slidetrack_core::client::ApiResponse;
    use slidetrack_core::config::ClientConfig;
    use slidetrack_core::events::NotificationPublisher;
    use slidetrack_core::storage::MemoryStore;
    use slidetrack_core::test_helpers::{ManualClock, ScriptedTransport};
    use slidetrack_core::RemoteTaskStatus;
    use std::sync::Arc;

    fn context(transport: Arc<ScriptedTransport>) -> SystemContext {
        let manager = ConfigManager::from_config(ClientConfig::default()).unwrap();
        SystemContext::from_parts(
            manager,
            transport,
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::default()),
        )
    }

    #[test]
    fn test_print_pending_drains_queue() {
        let publisher = NotificationPublisher::default();
        let mut rx = publisher.subscribe();
        assert_eq!(print_pending(&mut rx), 0);

        publisher.notify_task_status(&RemoteTaskStatus::Success, "a.tiff");
        publisher.notify_task_status(&RemoteTaskStatus::Failed, "b.tiff");
        assert_eq!(print_pending(&mut rx), 2);
        assert_eq!(print_pending(&mut rx), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_follows_start_and_completion() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            "POST /refresh",
            ApiResponse::json_body(200, &json!({"access_token": "tok", "expires_in": 900})),
        );
        transport.push(
            "POST /predict_structure",
            ApiResponse::json_body(200, &json!({"message": "accepted", "task_id": "t9"})),
        );
        transport.push(
            "GET /task-status/t9",
            ApiResponse::json_body(200, &json!({"status": "Success", "task_id": "t9"})),
        );
        let context = context(transport);
        assert!(context.start().await.unwrap());

        let printed = submit_and_follow(&context, vec!["a.tiff".into(), "b.tiff".into()])
            .await
            .unwrap();
        // Two "started" and two "completed"
        assert_eq!(printed, 4);

        context.shutdown().await.unwrap();
    }
}
