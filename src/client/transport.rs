//! # HTTP Transport
//!
//! The lowest layer of the request stack. A transport issues one request and
//! reports whatever the backend answered; it never interprets status codes,
//! never retries and never touches the session. Transport failures (no
//! response at all) surface as [`SlidetrackError::Transport`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{Result, SlidetrackError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    Multipart {
        field: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

/// A request relative to the configured API prefix
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    #[must_use]
    pub fn with_form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    #[must_use]
    pub fn with_multipart(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.body = RequestBody::Multipart {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
        };
        self
    }

    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Route key used in logs and by scripted transports, e.g. `GET /task-status/t1`
    pub fn route(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

// Bearer tokens and form bodies (passwords) stay out of debug output
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            RequestBody::Empty => "empty",
            RequestBody::Json(_) => "json",
            RequestBody::Form(_) => "form",
            RequestBody::Multipart { .. } => "multipart",
        };
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body", &body)
            .field("bearer", &self.bearer.as_ref().map(|_| "[MASKED]"))
            .finish()
    }
}

/// Status and raw body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json_body(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Map a non-2xx answer to the error taxonomy
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else if self.is_unauthorized() {
            Err(SlidetrackError::unauthorized(self.text()))
        } else {
            let message = self.text();
            Err(SlidetrackError::remote(self.status, message))
        }
    }

    /// Decode a successful body, mapping failures to the error taxonomy
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        self.error_for_status()?.json()
    }
}

/// Issues a single HTTP exchange
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Get the transport name for debugging/logging
    fn transport_name(&self) -> &'static str;

    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport
///
/// The cookie store is enabled so the long-lived refresh cookie set by the
/// backend is presented automatically, the way a browser sends credentials
/// with `credentials: include`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .build()
            .map_err(|e| SlidetrackError::config_error(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: join_base(&config.base_url, &config.api_prefix),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn join_base(base_url: &str, api_prefix: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let prefix = api_prefix.trim_matches('/');
    if prefix.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{prefix}")
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    fn transport_name(&self) -> &'static str {
        "reqwest"
    }

    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, path = %request.path, "Issuing request");

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Multipart {
                field,
                file_name,
                bytes,
            } => {
                let part = Part::bytes(bytes).file_name(file_name);
                builder.multipart(Form::new().part(field, part))
            }
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!(status = status, bytes = body.len(), "Received response");
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_base_handles_slashes() {
        assert_eq!(
            join_base("http://localhost:8000/", "/ikem_api"),
            "http://localhost:8000/ikem_api"
        );
        assert_eq!(join_base("http://localhost:8000", ""), "http://localhost:8000");
    }

    #[test]
    fn test_response_classification() {
        assert!(ApiResponse::new(204, "").is_success());
        assert!(ApiResponse::new(401, "").is_unauthorized());
        assert!(!ApiResponse::new(500, "").is_success());
    }

    #[test]
    fn test_error_for_status_maps_taxonomy() {
        let err = ApiResponse::new(401, "expired").error_for_status().unwrap_err();
        assert!(err.is_unauthorized());

        match ApiResponse::new(503, "busy").error_for_status().unwrap_err() {
            SlidetrackError::Remote { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "busy");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_into_json_decodes_success() {
        let response = ApiResponse::json_body(200, &json!({"task_id": "t1"}));
        let value: Value = response.into_json().unwrap();
        assert_eq!(value["task_id"], "t1");
    }

    #[test]
    fn test_debug_masks_bearer() {
        let request = ApiRequest::get("/get-tiff-files")
            .with_query("limit", "10")
            .with_bearer("secret-token");
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("[MASKED]"));
        assert_eq!(request.route(), "GET /get-tiff-files");
    }

    #[test]
    fn test_reqwest_transport_builds_from_config() {
        let transport = ReqwestTransport::new(&ApiConfig::default()).unwrap();
        assert!(transport.base_url().ends_with("/ikem_api"));
        assert_eq!(transport.transport_name(), "reqwest");
    }
}
