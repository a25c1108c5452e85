//! Job submission endpoints.

use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use vidshim_core::types::{Job, JobResult};

use crate::error::WorkerResult;
use crate::runner::run_to_completion;
use crate::state::AppState;

/// Request body for `/run` and `/runsync`.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    /// Job id; a fresh UUID is assigned when omitted.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub input: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub id: String,
    pub output: JobResult,
}

impl RunRequest {
    fn into_job(self) -> WorkerResult<Job> {
        let id = self
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(Job::from_value(serde_json::json!({
            "id": id,
            "input": self.input,
        }))?)
    }
}

/// POST /run -- a single handler invocation. Re-post the same `id` to poll.
async fn run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> WorkerResult<Json<RunResponse>> {
    let job = request.into_job()?;
    let output = state.handler.handle(&job).await;
    Ok(Json(RunResponse { id: job.id, output }))
}

/// POST /runsync -- invoke the handler until the job is terminal.
async fn run_sync(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> WorkerResult<Json<RunResponse>> {
    let job = request.into_job()?;
    let output = run_to_completion(&state.handler, &job, &state.shutdown).await;
    Ok(Json(RunResponse { id: job.id, output }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run", post(run))
        .route("/runsync", post(run_sync))
}
