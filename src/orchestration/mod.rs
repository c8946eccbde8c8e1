//! # Orchestration
//!
//! Tracking of asynchronous backend jobs.
//!
//! ```text
//! submit ──► JobBackend::submit ──► TaskRegistry::add ──► reconcile
//!                                                            │
//!                         ┌──────────────────────────────────┘
//!                         ▼
//!              one poll loop per job ──► JobBackend::status ──► reducer
//!                                                                 │
//!         Pending / unknown: keep polling ◄───────────────────────┤
//!         Success / Failed: board, notify, deregister, stop ◄─────┘
//! ```

pub mod backend;
pub mod board;
pub mod handles;
pub mod orchestrator;
pub(crate) mod poll_loop;
pub mod reducer;

pub use backend::JobBackend;
pub use board::ResourceBoard;
pub use handles::LoopHandles;
pub use orchestrator::PollOrchestrator;
pub use reducer::{reduce, LoopAction, Reduction};
