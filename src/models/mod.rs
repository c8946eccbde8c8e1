pub mod api;
pub mod job;
pub mod resource;

// Re-export core models for easy access
pub use api::{
    GeoJsonKind, PredictionRequest, PredictionResponse, RefreshResponse, TaskStatusResponse,
    TiffFile, TiffFileList, TokenResponse,
};
pub use job::{RemoteTaskStatus, TrackedJob};
pub use resource::{ResourceRecord, ResourceStatus};
