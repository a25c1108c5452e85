use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use vidshim_core::config::HandlerConfig;
use vidshim_core::error::CoreError;

use crate::error::WorkerError;

/// Worker process configuration loaded from environment variables.
///
/// Wraps the [`HandlerConfig`] and adds the settings of the surfaces
/// that drive it.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub handler: HandlerConfig,
    /// Bind address for serve mode (default: `0.0.0.0`).
    pub host: String,
    /// Bind port for serve mode (default: `8000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `600`). Bounds `/runsync`.
    pub request_timeout_secs: u64,
    /// How often expired prompt entries are swept (default: 60 s).
    pub sweep_interval: Duration,
    /// When set, run this job file to completion instead of serving.
    pub test_input: Option<PathBuf>,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default   |
    /// |------------------------------|-----------|
    /// | `HOST`                       | `0.0.0.0` |
    /// | `PORT`                       | `8000`    |
    /// | `REQUEST_TIMEOUT_SECS`       | `600`     |
    /// | `PROMPT_SWEEP_INTERVAL_SECS` | `60`      |
    /// | `TEST_INPUT_PATH`            | unset     |
    ///
    /// Handler settings are read by [`HandlerConfig::from_env`].
    pub fn from_env() -> Result<Self, CoreError> {
        let handler = HandlerConfig::from_env()?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env_number("PORT", 8000u16)?;
        let request_timeout_secs = env_number("REQUEST_TIMEOUT_SECS", 600u64)?;
        let sweep_interval_secs = env_number("PROMPT_SWEEP_INTERVAL_SECS", 60u64)?;
        if sweep_interval_secs == 0 {
            return Err(CoreError::Config(
                "PROMPT_SWEEP_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        let test_input = std::env::var("TEST_INPUT_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            handler,
            host,
            port,
            request_timeout_secs,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            test_input,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, WorkerError> {
        let ip = self
            .host
            .parse()
            .map_err(|_| WorkerError::InvalidAddress(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Config(format!("{key} has an invalid value: \"{raw}\""))),
        Err(_) => Ok(default),
    }
}
