//! In-process HTTP stand-in for the patent service

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const TASK_ID: &str = "task-42";

/// Recorded requests plus the canned stream body
#[derive(Default)]
pub struct ServiceState {
    pub stream_body: Vec<u8>,
    pub api_key: Mutex<Option<String>>,
    pub uploads: Mutex<Vec<String>>,
    pub stream_accept: Mutex<Vec<String>>,
}

impl ServiceState {
    pub fn with_stream(stream_body: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            stream_body,
            ..Self::default()
        })
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key.lock().unwrap().clone()
    }

    /// Raw multipart bodies received, lossily decoded
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn stream_accept(&self) -> Vec<String> {
        self.stream_accept.lock().unwrap().clone()
    }
}

pub fn router(state: Arc<ServiceState>) -> Router {
    Router::new()
        .route("/api/config", post(configure))
        .route("/api/upload", post(upload))
        .route("/api/status/:task_id", get(status))
        .route("/api/stream/:task_id", get(stream))
        .route("/api/download/:task_id/:doc_type", get(download))
        .route("/api/image/:task_id/:index", get(image))
        .with_state(state)
}

/// Serve on an ephemeral port; returns the API base URL
pub async fn spawn(state: Arc<ServiceState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{}/api", addr)
}

async fn configure(State(state): State<Arc<ServiceState>>, Json(payload): Json<Value>) -> Response {
    match payload.get("api_key").and_then(Value::as_str) {
        Some(key) => {
            *state.api_key.lock().unwrap() = Some(key.to_string());
            Json(json!({"message": "API key configured"})).into_response()
        }
        None => StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    }
}

async fn upload(State(state): State<Arc<ServiceState>>, headers: HeaderMap, body: Bytes) -> Response {
    let is_multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));
    if !is_multipart {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }

    let text = String::from_utf8_lossy(&body).into_owned();
    if !text.contains("name=\"file\"") {
        return (StatusCode::UNPROCESSABLE_ENTITY, "file is required").into_response();
    }
    state.uploads.lock().unwrap().push(text);
    Json(json!({"task_id": TASK_ID})).into_response()
}

async fn status(Path(task_id): Path<String>) -> Response {
    if task_id != TASK_ID {
        return (StatusCode::NOT_FOUND, "task not found").into_response();
    }
    Json(json!({
        "task_id": TASK_ID,
        "status": "running",
        "step": "2",
        "step_label": "Embodiments",
        "error": "",
        "files": {},
        "figures": 0
    }))
    .into_response()
}

async fn stream(
    State(state): State<Arc<ServiceState>>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) {
        state.stream_accept.lock().unwrap().push(accept.to_string());
    }
    if task_id != TASK_ID {
        return (StatusCode::NOT_FOUND, "task not found").into_response();
    }
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        state.stream_body.clone(),
    )
        .into_response()
}

async fn download(Path((task_id, doc_type)): Path<(String, String)>) -> Response {
    if task_id != TASK_ID {
        return (StatusCode::NOT_FOUND, "task not found").into_response();
    }
    match doc_type.as_str() {
        "specification" | "claims" | "abstract" => {
            format!("{} document", doc_type).into_bytes().into_response()
        }
        _ => (StatusCode::NOT_FOUND, format!("{} not generated", doc_type)).into_response(),
    }
}

async fn image(Path((task_id, index)): Path<(String, u32)>) -> Response {
    if task_id != TASK_ID || index >= 2 {
        return (StatusCode::NOT_FOUND, "figure not found").into_response();
    }
    (
        [(header::CONTENT_TYPE, "image/png")],
        format!("png {}", index).into_bytes(),
    )
        .into_response()
}
