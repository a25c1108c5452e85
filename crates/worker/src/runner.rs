//! Drive a job to a terminal result inside this process.
//!
//! Mimics the serverless runtime's re-delivery: call the handler, and
//! while it answers `in_progress` wait [`HandlerConfig::polling_interval`]
//! and call it again, up to [`HandlerConfig::polling_max_retries`] polls.
//!
//! [`HandlerConfig::polling_interval`]: vidshim_core::config::HandlerConfig::polling_interval
//! [`HandlerConfig::polling_max_retries`]: vidshim_core::config::HandlerConfig::polling_max_retries

use std::path::Path;

use tokio_util::sync::CancellationToken;
use vidshim_core::types::{Job, JobResult};

use crate::error::WorkerError;
use crate::handler::JobHandler;

/// Job id used when a test input file does not name one.
pub const LOCAL_TEST_JOB_ID: &str = "local-test";

pub async fn run_to_completion(
    handler: &JobHandler,
    job: &Job,
    cancel: &CancellationToken,
) -> JobResult {
    let interval = handler.config().polling_interval;
    let max_polls = handler.config().polling_max_retries;

    let mut result = handler.handle(job).await;
    let mut polls = 0u32;

    while !result.is_terminal() {
        if polls >= max_polls {
            tracing::warn!(job_id = %job.id, polls, "Gave up waiting for workflow output");
            handler.store().remove(&job.id).await;
            return JobResult::failed(format!(
                "Timed out waiting for workflow output after {polls} polls"
            ));
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job.id, "Job cancelled");
                handler.store().remove(&job.id).await;
                return JobResult::failed("Job cancelled");
            }
            _ = tokio::time::sleep(interval) => {}
        }

        polls += 1;
        result = handler.handle(job).await;
    }

    tracing::info!(job_id = %job.id, polls, status = ?result.status, "Job reached a terminal result");
    result
}

/// Load a job from a JSON file and run it to completion.
///
/// The file holds `{"input": {...}}`, optionally with an `"id"`.
pub async fn run_test_input(
    handler: &JobHandler,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<JobResult, WorkerError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let job = parse_test_input(&raw)?;

    tracing::info!(job_id = %job.id, path = %path.display(), "Running test input");
    Ok(run_to_completion(handler, &job, cancel).await)
}

fn parse_test_input(raw: &str) -> Result<Job, WorkerError> {
    let mut value: serde_json::Value = serde_json::from_str(raw)?;
    if let Some(record) = value.as_object_mut() {
        record
            .entry("id")
            .or_insert_with(|| serde_json::Value::from(LOCAL_TEST_JOB_ID));
    }
    Ok(Job::from_value(value)?)
}
