//! Job id -> ComfyUI prompt id tracking.
//!
//! The runtime re-delivers a job until it gets a terminal result, so the
//! handler must remember which prompt it queued for each job id. Entries
//! are dropped on terminal results and once a job has gone unseen for a
//! TTL, so a long-lived worker does not accumulate ids the runtime will
//! never send again. A job that keeps being delivered never expires.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Where a tracked job stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptState {
    /// First delivery is still validating, uploading, or submitting.
    Submitting,
    /// Workflow accepted by ComfyUI.
    Queued {
        prompt_id: String,
        /// Consecutive history polls that could not reach ComfyUI.
        poll_failures: u32,
    },
}

#[derive(Debug)]
struct PromptEntry {
    state: PromptState,
    /// Last time a delivery touched this job.
    last_seen: Instant,
}

/// Result of [`PromptStore::claim`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The id was unknown and is now reserved for the caller.
    New,
    /// Another invocation is submitting this job right now.
    Submitting,
    /// The job is queued under `prompt_id`.
    Queued { prompt_id: String },
}

/// In-memory prompt table shared by all handler invocations.
#[derive(Debug)]
pub struct PromptStore {
    entries: Mutex<HashMap<String, PromptEntry>>,
    ttl: Duration,
}

impl PromptStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up `job_id`, reserving it when unseen.
    ///
    /// Check and insert happen under one lock, so two concurrent
    /// deliveries of the same id cannot both submit a workflow. A hit
    /// refreshes the entry's idle clock.
    pub async fn claim(&self, job_id: &str) -> Claim {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(job_id) {
            Some(entry) => {
                entry.last_seen = Instant::now();
                match &entry.state {
                PromptState::Submitting => Claim::Submitting,
                    PromptState::Queued { prompt_id, .. } => Claim::Queued {
                        prompt_id: prompt_id.clone(),
                    },
                }
            }
            None => {
                entries.insert(
                    job_id.to_string(),
                    PromptEntry {
                        state: PromptState::Submitting,
                        last_seen: Instant::now(),
                    },
                );
                Claim::New
            }
        }
    }

    /// Record the prompt ComfyUI assigned to `job_id`.
    pub async fn record_queued(&self, job_id: &str, prompt_id: &str) {
        let mut entries = self.entries.lock().await;
        let state = PromptState::Queued {
            prompt_id: prompt_id.to_string(),
            poll_failures: 0,
        };
        entries
            .entry(job_id.to_string())
            .and_modify(|entry| {
                entry.state = state.clone();
                entry.last_seen = Instant::now();
            })
            .or_insert_with(|| PromptEntry {
                state,
                last_seen: Instant::now(),
            });
    }

    /// Count one more failed poll for `job_id` and return the new streak.
    ///
    /// Returns 0 when the job is not queued.
    pub async fn record_poll_failure(&self, job_id: &str) -> u32 {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(job_id).map(|entry| &mut entry.state) {
            Some(PromptState::Queued { poll_failures, .. }) => {
                *poll_failures += 1;
                *poll_failures
            }
            _ => 0,
        }
    }

    /// Clear the failed-poll streak after a successful poll.
    pub async fn reset_poll_failures(&self, job_id: &str) {
        let mut entries = self.entries.lock().await;
        if let Some(PromptState::Queued { poll_failures, .. }) =
            entries.get_mut(job_id).map(|entry| &mut entry.state)
        {
            *poll_failures = 0;
        }
    }

    pub async fn state(&self, job_id: &str) -> Option<PromptState> {
        self.entries
            .lock()
            .await
            .get(job_id)
            .map(|entry| entry.state.clone())
    }

    /// Forget `job_id`. Returns whether it was tracked.
    pub async fn remove(&self, job_id: &str) -> bool {
        self.entries.lock().await.remove(job_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Drop entries idle for at least the TTL. Returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now()).await
    }

    /// Drop entries not seen for at least one TTL as of `now`.
    pub async fn evict_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|job_id, entry| {
            let keep = now.saturating_duration_since(entry.last_seen) < self.ttl;
            if !keep {
                tracing::debug!(job_id = %job_id, state = ?entry.state, "Evicting expired prompt entry");
            }
            keep
        });
        before - entries.len()
    }
}
