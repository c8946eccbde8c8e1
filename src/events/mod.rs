pub mod publisher;

pub use publisher::{Notification, NotificationKind, NotificationPublisher};
