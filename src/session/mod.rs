//! # Session
//!
//! Credential lifecycle and inactivity tracking.
//!
//! - [`SessionManager`]: owns the in-memory credential, renews it and logs out
//! - [`SessionMonitor`]: runs the periodic inactivity and refresh checks
//! - [`Credential`], [`Clock`] and [`InteractionSignal`]: supporting types

pub mod activity;
pub mod clock;
pub mod credential;
pub mod manager;
pub mod monitor;

pub use activity::InteractionSignal;
pub use clock::{Clock, SystemClock};
pub use credential::Credential;
pub use manager::SessionManager;
pub use monitor::SessionMonitor;
