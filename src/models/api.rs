//! Wire shapes of the backend REST API.

use serde::{Deserialize, Serialize};

use super::job::RemoteTaskStatus;

/// `POST /refresh`
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    /// Seconds until expiry; absent on some deployments
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// `POST /token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiffFile {
    pub id: String,
    pub last_modified: String,
    pub size_bytes: f64,
}

/// `GET /get-tiff-files`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiffFileList {
    pub tiff_files: Vec<TiffFile>,
}

/// Body of `POST /predict_structure`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub tiff_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub message: String,
    pub task_id: String,
}

/// `GET /task-status/{task_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub status: RemoteTaskStatus,
    #[serde(default)]
    pub task_id: String,
}

/// `kind` query parameter of `GET /download_geojson/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoJsonKind {
    Tissue,
    Cell,
}

impl GeoJsonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tissue => "tissue",
            Self::Cell => "cell",
        }
    }
}

impl std::str::FromStr for GeoJsonKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tissue" => Ok(Self::Tissue),
            "cell" => Ok(Self::Cell),
            _ => Err(format!("Invalid GeoJSON type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_refresh_without_expiry() {
        let parsed: RefreshResponse =
            serde_json::from_value(json!({"access_token": "abc"})).unwrap();
        assert_eq!(parsed.access_token, "abc");
        assert!(parsed.expires_in.is_none());
    }

    #[test]
    fn test_task_status_decoding() {
        let parsed: TaskStatusResponse =
            serde_json::from_value(json!({"status": "Pending", "task_id": "t1"})).unwrap();
        assert_eq!(parsed.status, RemoteTaskStatus::Pending);
        assert_eq!(parsed.task_id, "t1");
    }

    #[test]
    fn test_file_list_decoding() {
        let parsed: TiffFileList = serde_json::from_value(json!({
            "tiff_files": [{"id": "a.tiff", "last_modified": "2026-02-01", "size_bytes": 3}]
        }))
        .unwrap();
        assert_eq!(parsed.tiff_files.len(), 1);
        assert_eq!(parsed.tiff_files[0].size_bytes, 3.0);
        assert_eq!("cell".parse::<GeoJsonKind>().unwrap(), GeoJsonKind::Cell);
    }
}
