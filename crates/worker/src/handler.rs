//! The job handler invoked once per job delivery.
//!
//! Each job id moves through three phases:
//!
//! 1. **Unseen** -- validate input, wait for ComfyUI, upload images,
//!    submit the workflow, remember the prompt id.
//! 2. **Queued** -- poll history once per delivery.
//! 3. **Terminal** -- return the video (or failure) and forget the job.
//!
//! The handler never loops on its own while a job is queued; the runtime
//! re-delivers the job, or [`crate::runner`] does it locally.

use std::sync::Arc;

use vidshim_comfyui::api::{ComfyUIApi, ComfyUIApiError};
use vidshim_comfyui::history::HistoryPoll;
use vidshim_comfyui::outputs::extract_video_output;
use vidshim_comfyui::readiness::{wait_for_server, ReadinessConfig};
use vidshim_comfyui::uploads::upload_images;
use vidshim_core::config::HandlerConfig;
use vidshim_core::types::{Job, JobResult};
use vidshim_core::validation::validate_input;

use crate::store::{Claim, PromptStore};

pub const WORKFLOW_QUEUED_MESSAGE: &str = "Workflow queued.";
pub const WAITING_FOR_OUTPUT_MESSAGE: &str = "Waiting for output...";

/// Drives jobs against a single ComfyUI instance.
///
/// Cheap to share behind an `Arc`; all mutable state lives in the
/// [`PromptStore`].
pub struct JobHandler {
    api: ComfyUIApi,
    config: Arc<HandlerConfig>,
    store: Arc<PromptStore>,
}

impl JobHandler {
    pub fn new(api: ComfyUIApi, config: HandlerConfig) -> Self {
        let store = Arc::new(PromptStore::new(config.prompt_ttl));
        Self {
            api,
            config: Arc::new(config),
            store,
        }
    }

    /// Build a handler with an HTTP client honouring the configured timeout.
    pub fn from_config(config: HandlerConfig) -> Result<Self, ComfyUIApiError> {
        let api = ComfyUIApi::with_timeout(config.comfy_url.clone(), config.request_timeout)?;
        Ok(Self::new(api, config))
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<PromptStore> {
        &self.store
    }

    /// Handle one delivery of `job`.
    pub async fn handle(&self, job: &Job) -> JobResult {
        let evicted = self.store.evict_expired().await;
        if evicted > 0 {
            tracing::info!(evicted, "Evicted expired prompt entries");
        }

        match self.store.claim(&job.id).await {
            Claim::New => self.start(job).await,
            Claim::Submitting => {
                tracing::debug!(job_id = %job.id, "Job is already being submitted");
                JobResult::in_progress(WORKFLOW_QUEUED_MESSAGE)
            }
            Claim::Queued { prompt_id } => self.poll(&job.id, &prompt_id).await,
        }
    }

    /// First delivery: stage inputs and queue the workflow.
    ///
    /// Any failure releases the claim so a re-delivery starts over.
    async fn start(&self, job: &Job) -> JobResult {
        let input = match validate_input(job.input.as_ref()) {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Rejected job input");
                self.store.remove(&job.id).await;
                return JobResult::failed(e.to_string());
            }
        };

        let readiness = ReadinessConfig {
            retries: self.config.api_available_max_retries,
            delay: self.config.api_available_interval,
        };
        if !wait_for_server(&self.api, &readiness).await {
            tracing::warn!(job_id = %job.id, "Continuing without confirmed ComfyUI readiness");
        }

        let upload = upload_images(&self.api, input.images.as_deref()).await;
        if upload.is_error() {
            tracing::warn!(job_id = %job.id, details = ?upload.details, "Image upload failed");
            self.store.remove(&job.id).await;
            return JobResult::from(upload);
        }

        match self.api.submit_workflow(&input.workflow).await {
            Ok(response) => {
                self.store.record_queued(&job.id, &response.prompt_id).await;
                tracing::info!(
                    job_id = %job.id,
                    prompt_id = %response.prompt_id,
                    queue_number = ?response.number,
                    "Queued workflow",
                );
                JobResult::in_progress(WORKFLOW_QUEUED_MESSAGE)
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to queue workflow");
                self.store.remove(&job.id).await;
                JobResult::failed(format!("Error queuing workflow: {e}"))
            }
        }
    }

    /// Later deliveries: one history poll.
    async fn poll(&self, job_id: &str, prompt_id: &str) -> JobResult {
        match self.api.poll_history(prompt_id).await {
            HistoryPoll::Pending => {
                self.store.reset_poll_failures(job_id).await;
                tracing::debug!(job_id, prompt_id, "Workflow output not ready");
                JobResult::in_progress(WAITING_FOR_OUTPUT_MESSAGE)
            }
            HistoryPoll::Unavailable(e) => {
                let failures = self.store.record_poll_failure(job_id).await;
                tracing::warn!(
                    job_id,
                    prompt_id,
                    failures,
                    error = %e,
                    "History poll failed",
                );

                match self.config.poll_failure_limit {
                    Some(limit) if failures >= limit => {
                        self.store.remove(job_id).await;
                        JobResult::failed(format!("Lost contact with ComfyUI while polling: {e}"))
                            .with_refresh_worker(self.config.refresh_worker)
                    }
                    _ => JobResult::in_progress(WAITING_FOR_OUTPUT_MESSAGE),
                }
            }
            HistoryPoll::Complete(outputs) => {
                let result = extract_video_output(&outputs, &self.config.output_path).await;
                self.store.remove(job_id).await;
                tracing::info!(job_id, prompt_id, status = ?result.status, "Job finished");
                result.with_refresh_worker(self.config.refresh_worker)
            }
        }
    }
}
