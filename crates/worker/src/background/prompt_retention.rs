//! Periodic eviction of stale prompt store entries.
//!
//! The handler already evicts on every invocation; this task covers idle
//! periods so an abandoned job does not linger until the next delivery.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::store::PromptStore;

/// Run the retention loop until `cancel` is triggered.
pub async fn run(store: Arc<PromptStore>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        ttl_secs = store.ttl().as_secs(),
        interval_secs = interval.as_secs(),
        "Prompt retention job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Prompt retention job stopping");
                break;
            }
            _ = ticker.tick() => {
                let evicted = store.evict_expired().await;
                if evicted > 0 {
                    tracing::info!(evicted, "Prompt retention: evicted expired entries");
                } else {
                    tracing::debug!("Prompt retention: nothing to evict");
                }
            }
        }
    }
}
