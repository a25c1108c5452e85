//! Wait for a freshly started ComfyUI server to accept requests.
//!
//! The worker container boots ComfyUI alongside the handler, so the
//! first job may arrive before the server listens. [`wait_for_server`]
//! probes the root URL on a fixed interval until it answers 200 or the
//! attempt budget runs out.

use std::time::Duration;

use crate::api::ComfyUIApi;

/// Tunable parameters for the fixed-interval probe.
#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    /// Maximum number of probes.
    pub retries: u32,
    /// Sleep after each failed probe.
    pub delay: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            retries: 500,
            delay: Duration::from_millis(50),
        }
    }
}

impl ReadinessConfig {
    /// Worst-case time spent before giving up.
    pub fn budget(&self) -> Duration {
        self.delay * self.retries
    }
}

/// Probe ComfyUI until it returns HTTP 200.
///
/// Returns `true` as soon as a probe succeeds and `false` after
/// `config.retries` failed probes. Transport errors count as failed
/// probes; this function never errors.
pub async fn wait_for_server(api: &ComfyUIApi, config: &ReadinessConfig) -> bool {
    for attempt in 1..=config.retries {
        match api.probe().await {
            Ok(true) => {
                tracing::info!(url = %api.api_url(), attempt, "ComfyUI API is reachable");
                return true;
            }
            Ok(false) => {
                tracing::trace!(attempt, "ComfyUI answered with a non-200 status");
            }
            Err(e) => {
                tracing::trace!(attempt, error = %e, "ComfyUI probe failed");
            }
        }

        tokio::time::sleep(config.delay).await;
    }

    tracing::warn!(
        url = %api.api_url(),
        retries = config.retries,
        "Failed to connect to ComfyUI after {} attempts",
        config.retries,
    );
    false
}
