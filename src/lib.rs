#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Slidetrack Core
//!
//! Session and task-orchestration core for the slide imagery processing
//! client.
//!
//! ## Overview
//!
//! The crate keeps a user's authenticated session alive while they are
//! active, ends it when they go idle, and tracks long-running backend
//! processing jobs until each one finishes. Tracked jobs survive a restart
//! through a durable key-value store.
//!
//! ## Module Organization
//!
//! - [`session`] - Credential lifecycle, renewal, inactivity logout
//! - [`client`] - HTTP transport, authenticated request wrapper, typed API
//! - [`registry`] - Durable registry of in-flight jobs and cached rows
//! - [`orchestration`] - One poll loop per job, status reduction, cleanup
//! - [`storage`] - Durable key-value store (memory or file backed)
//! - [`state_machine`] - Session lifecycle transitions
//! - [`events`] - User-facing notifications
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slidetrack_core::config::ConfigManager;
//! use slidetrack_core::SystemContext;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let context = SystemContext::from_config(ConfigManager::load()?).await?;
//! if context.start().await? {
//!     let job = context.orchestrator.submit(vec!["slide-1.tiff".into()]).await?;
//!     println!("tracking {}", job.job_id);
//! }
//! context.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod session;
pub mod state_machine;
pub mod storage;
pub mod system_context;
pub mod test_helpers;

pub use client::{AuthenticatedClient, HttpTransport, ImageryApi, ReqwestTransport};
pub use config::{ClientConfig, ConfigManager};
pub use error::{Result, SlidetrackError};
pub use events::{Notification, NotificationKind, NotificationPublisher};
pub use models::{RemoteTaskStatus, ResourceRecord, ResourceStatus, TrackedJob};
pub use orchestration::{JobBackend, PollOrchestrator, ResourceBoard};
pub use registry::{RecordStatusCache, TaskRegistry};
pub use session::{Clock, SessionManager, SessionMonitor, SystemClock};
pub use state_machine::{LogoutReason, SessionEvent, SessionState};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use system_context::SystemContext;
