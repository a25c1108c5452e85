//! Shared helpers for worker integration tests.
//!
//! Provides an in-process fake ComfyUI server and handler/config builders.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use vidshim_core::config::HandlerConfig;
use vidshim_worker::handler::JobHandler;

/// Adjustable behaviour and recorded traffic of the fake server.
pub struct FakeComfy {
    pub root_status: Mutex<StatusCode>,
    pub history_status: Mutex<StatusCode>,
    pub history: Mutex<Value>,
    pub prompts: Mutex<Vec<Value>>,
    pub uploads: Mutex<Vec<String>>,
}

impl Default for FakeComfy {
    fn default() -> Self {
        Self {
            root_status: Mutex::new(StatusCode::OK),
            history_status: Mutex::new(StatusCode::OK),
            history: Mutex::new(json!({})),
            prompts: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }
}

impl FakeComfy {
    pub fn set_history(&self, history: Value) {
        *self.history.lock().unwrap() = history;
    }

    pub fn set_history_status(&self, status: StatusCode) {
        *self.history_status.lock().unwrap() = status;
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

/// Bind the fake on an ephemeral port and return its base URL.
pub async fn spawn_comfy(fake: Arc<FakeComfy>) -> String {
    let app = Router::new()
        .route("/", get(root))
        .route("/upload/image", post(upload))
        .route("/prompt", post(prompt))
        .route("/history/{prompt_id}", get(history))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake ComfyUI");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake ComfyUI");
    });
    format!("http://{addr}")
}

async fn root(State(fake): State<Arc<FakeComfy>>) -> StatusCode {
    *fake.root_status.lock().unwrap()
}

async fn upload(State(fake): State<Arc<FakeComfy>>, mut multipart: Multipart) -> Response {
    let mut filename = String::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("image") {
            filename = field.file_name().unwrap_or_default().to_string();
            let _ = field.bytes().await;
        }
    }
    fake.uploads.lock().unwrap().push(filename.clone());

    if filename.starts_with("bad") {
        (StatusCode::INTERNAL_SERVER_ERROR, "disk full").into_response()
    } else {
        Json(json!({"name": filename, "subfolder": "", "type": "input"})).into_response()
    }
}

async fn prompt(State(fake): State<Arc<FakeComfy>>, Json(body): Json<Value>) -> Response {
    let mut prompts = fake.prompts.lock().unwrap();
    prompts.push(body.clone());
    let number = prompts.len();

    if body["prompt"].get("invalid").is_some() {
        return (StatusCode::BAD_REQUEST, "invalid prompt").into_response();
    }
    Json(json!({"prompt_id": format!("prompt-{number}"), "number": number})).into_response()
}

async fn history(State(fake): State<Arc<FakeComfy>>, UrlPath(_id): UrlPath<String>) -> Response {
    let status = *fake.history_status.lock().unwrap();
    if status != StatusCode::OK {
        return (status, "history unavailable").into_response();
    }
    Json(fake.history.lock().unwrap().clone()).into_response()
}

/// Handler configuration with fast intervals pointing at `comfy_url`.
pub fn test_config(comfy_url: &str, output_path: &Path) -> HandlerConfig {
    HandlerConfig {
        comfy_url: comfy_url.to_string(),
        api_available_interval: Duration::from_millis(5),
        api_available_max_retries: 3,
        polling_interval: Duration::from_millis(5),
        polling_max_retries: 20,
        output_path: output_path.to_path_buf(),
        refresh_worker: false,
        request_timeout: Duration::from_secs(5),
        prompt_ttl: Duration::from_secs(600),
        poll_failure_limit: None,
    }
}

pub fn handler(config: HandlerConfig) -> JobHandler {
    JobHandler::from_config(config).expect("build handler")
}

/// History document in which `prompt_id` produced one video.
pub fn video_history(prompt_id: &str, subfolder: &str, filename: &str) -> Value {
    json!({
        prompt_id: {
            "outputs": {
                "9": {"videos": [{"subfolder": subfolder, "filename": filename, "type": "output"}]}
            },
            "status": {"status_str": "success", "completed": true}
        }
    })
}

/// Minimal workflow graph ending in a video save node.
pub fn workflow() -> Value {
    json!({
        "9": {"class_type": "SaveVideo", "inputs": {"filename_prefix": "clip"}}
    })
}

// ---------------------------------------------------------------------------
// HTTP helpers for router tests
// ---------------------------------------------------------------------------

pub async fn get_request(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
