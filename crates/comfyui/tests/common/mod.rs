//! In-process fake of the ComfyUI HTTP surface used by the client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Shared, inspectable state behind the fake server.
pub struct FakeState {
    /// Status returned by `GET /`.
    pub root_status: StatusCode,
    /// Number of `GET /` requests received.
    pub probes: AtomicUsize,
    /// `(filename, overwrite)` per upload, in arrival order.
    pub uploads: Mutex<Vec<(String, Option<String>)>>,
    /// Bodies posted to `/prompt`.
    pub prompts: Mutex<Vec<Value>>,
    /// Document served from `/history/{id}`.
    pub history: Mutex<Value>,
}

impl FakeState {
    pub fn new(root_status: StatusCode) -> Self {
        Self {
            root_status,
            probes: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            history: Mutex::new(json!({})),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

/// Bind the fake on an ephemeral port and return its base URL.
pub async fn spawn(state: Arc<FakeState>) -> String {
    let app = Router::new()
        .route("/", get(root))
        .route("/upload/image", post(upload))
        .route("/prompt", post(prompt))
        .route("/history/{prompt_id}", get(history))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake ComfyUI");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake ComfyUI");
    });

    format!("http://{addr}")
}

async fn root(State(state): State<Arc<FakeState>>) -> StatusCode {
    state.probes.fetch_add(1, Ordering::SeqCst);
    state.root_status
}

/// Filenames starting with `bad` are rejected with a 500, and those
/// starting with `accepted` get a bodyless 202.
async fn upload(State(state): State<Arc<FakeState>>, mut multipart: Multipart) -> impl IntoResponse {
    let mut filename = String::new();
    let mut overwrite = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "image" => {
                filename = field.file_name().unwrap_or_default().to_string();
                let _ = field.bytes().await;
            }
            "overwrite" => overwrite = field.text().await.ok(),
            _ => {}
        }
    }

    state
        .uploads
        .lock()
        .unwrap()
        .push((filename.clone(), overwrite));

    if filename.starts_with("bad") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "disk full".to_string()).into_response();
    }
    if filename.starts_with("accepted") {
        return StatusCode::ACCEPTED.into_response();
    }
    Json(json!({"name": filename, "subfolder": "", "type": "input"})).into_response()
}

/// Workflows containing an `invalid` node are rejected with a 400.
async fn prompt(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> impl IntoResponse {
    let mut prompts = state.prompts.lock().unwrap();
    prompts.push(body.clone());
    let number = prompts.len();

    if body["prompt"].get("invalid").is_some() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"type": "prompt_outputs_failed_validation"}})),
        )
            .into_response();
    }
    Json(json!({"prompt_id": format!("prompt-{number}"), "number": number, "node_errors": {}}))
        .into_response()
}

async fn history(State(state): State<Arc<FakeState>>, Path(_prompt_id): Path<String>) -> Json<Value> {
    Json(state.history.lock().unwrap().clone())
}
