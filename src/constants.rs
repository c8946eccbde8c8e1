//! # System Constants
//!
//! Storage keys, endpoint paths and timing defaults shared by the session and
//! orchestration layers. Storage keys and endpoint paths must stay stable: the
//! durable store outlives a process and the backend contract is fixed.

use std::time::Duration;

/// Keys in the durable key-value store
pub mod storage_keys {
    /// Sequence of tracked jobs
    pub const PROCESSING_TASKS: &str = "processingTasks";
    /// Cached resource rows
    pub const RECORD_STATUSES: &str = "recordStatuses";
    /// Last user activity (epoch millis)
    pub const LAST_ACTIVITY: &str = "lastActivity";
    /// Legacy authenticated flag
    pub const IS_AUTHENTICATED: &str = "isAuthenticated";
    /// Location to return to after a forced logout
    pub const LOGIN_REDIRECT: &str = "loginRedirect";
}

/// Backend endpoint paths, relative to the configured API prefix
pub mod endpoints {
    pub const REFRESH: &str = "/refresh";
    pub const TOKEN: &str = "/token";
    pub const LOGOUT: &str = "/logout";
    pub const TIFF_FILES: &str = "/get-tiff-files";
    pub const PREDICT_STRUCTURE: &str = "/predict_structure";
    pub const TASK_STATUS: &str = "/task-status";
    pub const CLEAR_TIFF_DATA: &str = "/clear-tiff-data";
    pub const DOWNLOAD_GEOJSON: &str = "/download_geojson";
    pub const UPLOAD_ZIP: &str = "/upload_zip";

    /// Multipart field name the upload endpoint expects
    pub const UPLOAD_FIELD: &str = "zipFolder";
}

/// Timing defaults
pub mod defaults {
    use super::Duration;

    pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
    pub const REFRESH_MARGIN: Duration = Duration::from_secs(2 * 60);
    pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30 * 60);
    pub const INACTIVITY_CHECK_INTERVAL: Duration = Duration::from_secs(60);
    pub const REFRESH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
    /// Used when the refresh response carries no `expires_in`
    pub const TOKEN_TTL: Duration = Duration::from_secs(900);
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const NOTIFICATION_CAPACITY: usize = 256;
}

/// Notification event names published alongside each notification
pub mod events {
    pub const JOB_SUBMITTED: &str = "job.submitted";
    pub const JOB_SUCCEEDED: &str = "job.succeeded";
    pub const JOB_FAILED: &str = "job.failed";
    pub const SESSION_TERMINATED: &str = "session.terminated";
}
