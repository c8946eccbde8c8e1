//! # Notification Publisher
//!
//! Broadcast fan-out of user-facing notifications. Display, read tracking
//! and dismissal belong to subscribers.
//!
//! ```rust
//! use slidetrack_core::events::{NotificationKind, NotificationPublisher};
//! use slidetrack_core::models::RemoteTaskStatus;
//!
//! # tokio_test::block_on(async {
//! let publisher = NotificationPublisher::new(16);
//! let mut inbox = publisher.subscribe();
//!
//! publisher.notify_task_status(&RemoteTaskStatus::Success, "slide-1.tiff");
//!
//! let notification = inbox.recv().await.unwrap();
//! assert_eq!(notification.kind, NotificationKind::Success);
//! assert_eq!(notification.message, "Processing completed for slide-1.tiff");
//! # });
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::constants::{defaults, events};
use crate::models::RemoteTaskStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

/// User-facing notification; display is up to the subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    /// Event name, e.g. `job.succeeded`
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Broadcast emitter for notifications
#[derive(Debug, Clone)]
pub struct NotificationPublisher {
    sender: broadcast::Sender<Notification>,
}

impl Default for NotificationPublisher {
    fn default() -> Self {
        Self::new(defaults::NOTIFICATION_CAPACITY)
    }
}

impl NotificationPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Emit a notification; having no subscribers is not an error
    pub fn publish(
        &self,
        kind: NotificationKind,
        event: impl Into<String>,
        message: impl Into<String>,
    ) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            event: event.into(),
            timestamp: Utc::now(),
            read: false,
        };

        if self.sender.send(notification.clone()).is_err() {
            debug!(event = %notification.event, "No notification subscribers");
        }
        notification
    }

    /// Emit the status notification for one resource of a job
    ///
    /// Resources without a name get no notification.
    pub fn notify_task_status(
        &self,
        status: &RemoteTaskStatus,
        resource_name: &str,
    ) -> Option<Notification> {
        if resource_name.trim().is_empty() {
            return None;
        }

        let (kind, event, message) = match status {
            RemoteTaskStatus::Success => (
                NotificationKind::Success,
                events::JOB_SUCCEEDED,
                format!("Processing completed for {resource_name}"),
            ),
            RemoteTaskStatus::Failed => (
                NotificationKind::Error,
                events::JOB_FAILED,
                format!("Processing failed for {resource_name}"),
            ),
            RemoteTaskStatus::Pending => (
                NotificationKind::Info,
                events::JOB_SUBMITTED,
                format!("Processing started for {resource_name}"),
            ),
            RemoteTaskStatus::Unrecognized(raw) => (
                NotificationKind::Info,
                events::JOB_SUBMITTED,
                format!("Task status updated: {raw}"),
            ),
        };

        Some(self.publish(kind, event, message))
    }
}
