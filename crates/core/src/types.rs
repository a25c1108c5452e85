//! Job records and handler results exchanged with the serverless runtime.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A single job delivery from the serverless runtime.
///
/// The runtime re-delivers the same `id` until the handler returns a
/// terminal result. `input` is kept raw; it is checked by
/// [`validate_input`](crate::validation::validate_input) on first sight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub input: Option<serde_json::Value>,
}

impl Job {
    pub fn new(id: impl Into<String>, input: Option<serde_json::Value>) -> Self {
        Self {
            id: id.into(),
            input,
        }
    }

    /// Decode a raw `{id, input}` record.
    ///
    /// The `id` must be a non-empty string; `input` may be missing, in
    /// which case validation reports it later as a failed job.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CoreError> {
        let job: Job = serde_json::from_value(value)
            .map_err(|e| CoreError::Validation(format!("Malformed job record: {e}")))?;
        if job.id.trim().is_empty() {
            return Err(CoreError::Validation(
                "Job id must not be empty".to_string(),
            ));
        }
        Ok(job)
    }
}

/// One image to stage on the media server before the workflow runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInput {
    /// Filename the workflow references (e.g. in a `LoadImage` node).
    pub name: String,
    /// Base64-encoded image bytes.
    pub image: String,
}

/// Validated job input.
#[derive(Debug, Clone, PartialEq)]
pub struct JobInput {
    /// Opaque ComfyUI workflow graph in API format.
    pub workflow: serde_json::Value,
    pub images: Option<Vec<ImageInput>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Failed,
    InProgress,
    Success,
}

/// Result returned to the runtime for one handler invocation.
///
/// On success `message` carries the base64-encoded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_worker: Option<bool>,
    /// Per-image messages, only present on upload failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl JobResult {
    fn with_status(status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            refresh_worker: None,
            details: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::with_status(JobStatus::Failed, message)
    }

    pub fn in_progress(message: impl Into<String>) -> Self {
        Self::with_status(JobStatus::InProgress, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::with_status(JobStatus::Success, message)
    }

    pub fn with_refresh_worker(mut self, refresh_worker: bool) -> Self {
        self.refresh_worker = Some(refresh_worker);
        self
    }

    /// `true` once the runtime should stop re-delivering the job.
    pub fn is_terminal(&self) -> bool {
        self.status != JobStatus::InProgress
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Success,
    Error,
}

/// Aggregate outcome of staging all input images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub status: UploadStatus,
    pub message: String,
    /// One message per image, in input order.
    pub details: Vec<String>,
}

impl UploadResult {
    pub fn is_error(&self) -> bool {
        self.status == UploadStatus::Error
    }
}

impl From<UploadResult> for JobResult {
    /// Upload failures are terminal; the per-image messages travel along.
    fn from(upload: UploadResult) -> Self {
        let status = match upload.status {
            UploadStatus::Success => JobStatus::Success,
            UploadStatus::Error => JobStatus::Failed,
        };
        JobResult {
            status,
            message: upload.message,
            refresh_worker: None,
            details: Some(upload.details),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn in_progress_result_omits_optional_fields() {
        let value = serde_json::to_value(JobResult::in_progress("Workflow queued.")).unwrap();
        assert_eq!(
            value,
            json!({"status": "in_progress", "message": "Workflow queued."})
        );
    }

    #[test]
    fn terminal_result_carries_refresh_flag() {
        let result = JobResult::success("AAAA").with_refresh_worker(true);
        assert!(result.is_terminal());

        let value = serde_json::to_value(result).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["refresh_worker"], true);
        assert!(value.get("details").is_none());
    }

    #[test]
    fn upload_error_becomes_failed_job_with_details() {
        let upload = UploadResult {
            status: UploadStatus::Error,
            message: "Upload result".to_string(),
            details: vec![
                "Successfully uploaded a.png".to_string(),
                "Error uploading b.png: boom".to_string(),
            ],
        };
        let result = JobResult::from(upload);

        assert_eq!(result.status, JobStatus::Failed);
        assert_eq!(result.details.as_ref().map(Vec::len), Some(2));
        assert!(result.is_terminal());
    }

    #[test]
    fn job_from_value_accepts_missing_input() {
        let job = Job::from_value(json!({"id": "job-1"})).unwrap();
        assert_eq!(job.id, "job-1");
        assert!(job.input.is_none());
    }

    #[test]
    fn job_from_value_rejects_blank_id() {
        let err = Job::from_value(json!({"id": "  ", "input": {}})).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn job_from_value_rejects_missing_id() {
        assert!(Job::from_value(json!({"input": {}})).is_err());
    }
}
