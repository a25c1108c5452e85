//! `vidshim-worker` -- serverless job handler for a local ComfyUI server.
//!
//! Accepts `{id, input}` jobs, stages images and queues the workflow on
//! ComfyUI, and returns the finished video base64-encoded.
//!
//! Runs in one of two modes:
//!
//! - **Test input** (`TEST_INPUT_PATH` set): run that job file to a
//!   terminal result, print it as JSON, and exit.
//! - **Serve** (default): expose `/run`, `/runsync`, and `/health`.
//!
//! See [`WorkerConfig::from_env`] and
//! [`HandlerConfig::from_env`](vidshim_core::config::HandlerConfig::from_env)
//! for the environment variables.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidshim_worker::config::WorkerConfig;
use vidshim_worker::error::WorkerResult;
use vidshim_worker::handler::JobHandler;
use vidshim_worker::state::AppState;
use vidshim_worker::{background, routes, runner};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidshim_worker=info,vidshim_comfyui=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        comfy_url = %config.handler.comfy_url,
        output_path = %config.handler.output_path.display(),
        refresh_worker = config.handler.refresh_worker,
        "Loaded worker configuration",
    );

    let result = match config.test_input.clone() {
        Some(path) => run_test_input(config, path).await,
        None => serve(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Worker exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run_test_input(config: WorkerConfig, path: std::path::PathBuf) -> WorkerResult<()> {
    let handler = JobHandler::from_config(config.handler)?;

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel_on_signal.cancel();
    });

    let result = runner::run_test_input(&handler, &path, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn serve(config: WorkerConfig) -> WorkerResult<()> {
    let addr = config.bind_addr()?;
    let handler = Arc::new(JobHandler::from_config(config.handler.clone())?);
    let shutdown = CancellationToken::new();

    // --- Background tasks ---
    let retention_handle = tokio::spawn(background::prompt_retention::run(
        Arc::clone(handler.store()),
        config.sweep_interval,
        shutdown.child_token(),
    ));

    // --- Router ---
    let state = AppState {
        handler,
        shutdown: shutdown.clone(),
    };
    let app = routes::app(state, Duration::from_secs(config.request_timeout_secs));

    // --- Start server ---
    tracing::info!(%addr, "Starting job endpoint");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown_on_signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_on_signal.cancel();
        })
        .await?;

    // --- Post-shutdown cleanup ---
    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
