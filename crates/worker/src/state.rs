use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::handler::JobHandler;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// The job handler and its prompt store.
    pub handler: Arc<JobHandler>,
    /// Cancelled on shutdown; aborts in-flight `/runsync` jobs.
    pub shutdown: CancellationToken,
}
