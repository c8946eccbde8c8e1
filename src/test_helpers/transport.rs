use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::client::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::error::{Result, SlidetrackError};

#[derive(Debug)]
enum Scripted {
    Response(ApiResponse),
    Error(String),
}

/// Transport that answers from per-route scripts
///
/// Routes are keyed the way [`ApiRequest::route`] renders them, e.g.
/// `"POST /refresh"`. Each scripted answer is used once, in order; a route
/// with nothing left answers 404. Every request is recorded. A held route
/// records its requests but answers none until released.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<ApiRequest>>,
    held: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, route: &str, response: ApiResponse) {
        self.scripts
            .lock()
            .entry(route.to_string())
            .or_default()
            .push_back(Scripted::Response(response));
    }

    /// Script a failure that never reached the backend
    pub fn push_error(&self, route: &str, message: &str) {
        self.scripts
            .lock()
            .entry(route.to_string())
            .or_default()
            .push_back(Scripted::Error(message.to_string()));
    }

    /// Park requests on `route` until [`release`](Self::release)
    pub fn hold(&self, route: &str) {
        self.held
            .lock()
            .insert(route.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, route: &str) {
        if let Some(gate) = self.held.lock().remove(route) {
            gate.close();
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, route: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.route() == route)
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    fn transport_name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let route = request.route();
        self.requests.lock().push(request);

        let gate = self.held.lock().get(&route).cloned();
        if let Some(gate) = gate {
            // Resolves with an error once the gate is closed
            let _ = gate.acquire().await;
        }

        let next = self
            .scripts
            .lock()
            .get_mut(&route)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Error(message)) => Err(SlidetrackError::Transport(message)),
            None => Ok(ApiResponse::new(404, format!("no script for {route}"))),
        }
    }
}
