//! # Imagery API
//!
//! Typed wrappers over the backend endpoints. Every call goes through the
//! [`AuthenticatedClient`]; status polling uses its background variant so it
//! never keeps an idle session alive.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::constants::endpoints;
use crate::error::{Result, SlidetrackError};
use crate::models::{
    GeoJsonKind, PredictionRequest, PredictionResponse, RemoteTaskStatus, TaskStatusResponse,
    TiffFileList,
};
use crate::orchestration::backend::JobBackend;

use super::authenticated::AuthenticatedClient;
use super::transport::ApiRequest;

#[derive(Debug, Clone)]
pub struct ImageryApi {
    client: AuthenticatedClient,
    poller: AuthenticatedClient,
}

impl ImageryApi {
    pub fn new(client: AuthenticatedClient) -> Self {
        let poller = client.background();
        Self { client, poller }
    }

    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    /// `GET /get-tiff-files`
    pub async fn list_tiff_files(&self, limit: Option<u32>) -> Result<TiffFileList> {
        let mut request = ApiRequest::get(endpoints::TIFF_FILES);
        if let Some(limit) = limit {
            request = request.with_query("limit", limit.to_string());
        }
        let files: TiffFileList = self.client.send(request).await?.into_json()?;
        debug!(count = files.tiff_files.len(), "Listed TIFF files");
        Ok(files)
    }

    /// `POST /predict_structure`; ids are sent without their final extension
    pub async fn predict_structure(&self, resource_ids: &[String]) -> Result<PredictionResponse> {
        let body = PredictionRequest {
            tiff_ids: resource_ids
                .iter()
                .map(|id| strip_extension(id).to_string())
                .collect(),
        };
        let request =
            ApiRequest::post(endpoints::PREDICT_STRUCTURE).with_json(serde_json::to_value(&body)?);
        let prediction: PredictionResponse = self.client.send(request).await?.into_json()?;
        info!(job_id = %prediction.task_id, "Prediction accepted");
        Ok(prediction)
    }

    /// `GET /task-status/{task_id}`
    pub async fn task_status(&self, job_id: &str) -> Result<TaskStatusResponse> {
        let request = ApiRequest::get(format!("{}/{}", endpoints::TASK_STATUS, job_id));
        self.poller.send(request).await?.into_json()
    }

    /// `DELETE /clear-tiff-data/{id}`; the id is cut at its first dot
    pub async fn delete_tiff_data(&self, resource_id: &str) -> Result<()> {
        let request =
            ApiRequest::delete(format!("{}/{}", endpoints::CLEAR_TIFF_DATA, base_name(resource_id)));
        self.client.send(request).await?.error_for_status()?;
        Ok(())
    }

    /// `GET /download_geojson/{id}?type=`; returns the raw document
    pub async fn download_geojson(&self, resource_id: &str, kind: GeoJsonKind) -> Result<Vec<u8>> {
        let request = ApiRequest::get(format!("{}/{}", endpoints::DOWNLOAD_GEOJSON, resource_id))
            .with_query("type", kind.as_str());
        Ok(self.client.send(request).await?.error_for_status()?.body)
    }

    /// `POST /upload_zip` as multipart; archive contents are not inspected
    pub async fn upload_zip(&self, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        if bytes.is_empty() {
            return Err(SlidetrackError::validation(format!("{file_name} is empty")));
        }
        let request = ApiRequest::post(endpoints::UPLOAD_ZIP).with_multipart(
            endpoints::UPLOAD_FIELD,
            file_name,
            bytes,
        );
        self.client.send(request).await?.error_for_status()?;
        info!(file_name = %file_name, "Archive uploaded");
        Ok(())
    }
}

#[async_trait]
impl JobBackend for ImageryApi {
    async fn submit(&self, resource_ids: &[String]) -> Result<String> {
        Ok(self.predict_structure(resource_ids).await?.task_id)
    }

    async fn status(&self, job_id: &str) -> Result<RemoteTaskStatus> {
        Ok(self.task_status(job_id).await?.status)
    }
}

/// Drop the final extension (`a.b.tiff` -> `a.b`); ids without one are kept whole
pub fn strip_extension(id: &str) -> &str {
    id.rfind('.').map_or(id, |dot| &id[..dot])
}

/// Keep everything before the first dot (`a.b.tiff` -> `a`)
pub fn base_name(id: &str) -> &str {
    id.split('.').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::{ApiResponse, RequestBody};
    use crate::config::SessionConfig;
    use crate::session::SessionManager;
    use crate::storage::MemoryStore;
    use crate::test_helpers::{ManualClock, ScriptedTransport};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_id_normalisation() {
        assert_eq!(strip_extension("slide.01.tiff"), "slide.01");
        assert_eq!(strip_extension("slide"), "slide");
        assert_eq!(base_name("slide.01.tiff"), "slide");
        assert_eq!(base_name("slide"), "slide");
    }

    async fn api() -> (Arc<ScriptedTransport>, ImageryApi) {
        let transport = Arc::new(ScriptedTransport::new());
        let session = Arc::new(SessionManager::new(
            transport.clone(),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::default()),
            SessionConfig::default(),
        ));
        transport.push(
            "POST /refresh",
            ApiResponse::json_body(200, &json!({"access_token": "tok", "expires_in": 900})),
        );
        assert!(session.renew().await);
        transport.clear_requests();
        (
            transport.clone(),
            ImageryApi::new(AuthenticatedClient::new(transport, session)),
        )
    }

    #[tokio::test]
    async fn test_submit_strips_extensions() {
        let (transport, api) = api().await;
        transport.push(
            "POST /predict_structure",
            ApiResponse::json_body(200, &json!({"message": "queued", "task_id": "t1"})),
        );

        let job_id = api
            .submit(&["A.tiff".to_string(), "B.x.tif".to_string()])
            .await
            .unwrap();
        assert_eq!(job_id, "t1");

        let requests = transport.requests();
        assert_eq!(requests[0].body, RequestBody::Json(json!({"tiff_ids": ["A", "B.x"]})));
    }

    #[tokio::test]
    async fn test_status_maps_remote_failure() {
        let (transport, api) = api().await;
        transport.push("GET /task-status/t1", ApiResponse::new(502, "bad gateway"));

        let err = api.status("t1").await.unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_delete_uses_base_name() {
        let (transport, api) = api().await;
        transport.push("DELETE /clear-tiff-data/slide", ApiResponse::new(204, ""));

        api.delete_tiff_data("slide.01.tiff").await.unwrap();
        assert_eq!(transport.requests()[0].route(), "DELETE /clear-tiff-data/slide");
    }

    #[tokio::test]
    async fn test_download_passes_kind() {
        let (transport, api) = api().await;
        transport.push(
            "GET /download_geojson/slide.tiff",
            ApiResponse::new(200, "{\"type\":\"FeatureCollection\"}"),
        );

        let body = api
            .download_geojson("slide.tiff", GeoJsonKind::Tissue)
            .await
            .unwrap();
        assert!(!body.is_empty());
        assert_eq!(
            transport.requests()[0].query,
            vec![("type".to_string(), "tissue".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected_locally() {
        let (transport, api) = api().await;
        let err = api.upload_zip("batch.zip", Vec::new()).await.unwrap_err();
        assert!(matches!(err, SlidetrackError::Validation(_)));
        assert!(transport.requests().is_empty());
    }
}
