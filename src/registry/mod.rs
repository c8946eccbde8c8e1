//! # Registry
//!
//! Durable bookkeeping backed by the key-value store.
//!
//! - [`TaskRegistry`]: in-flight jobs under `processingTasks`; survives reloads
//! - [`RecordStatusCache`]: last displayed resource rows under `recordStatuses`
//!
//! Neither performs network I/O.

pub mod record_cache;
pub mod task_registry;

pub use record_cache::RecordStatusCache;
pub use task_registry::TaskRegistry;
