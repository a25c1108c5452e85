use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// Job handler configuration.
///
/// Loaded once at startup and validated before the worker accepts jobs.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Base URL of the local ComfyUI server.
    pub comfy_url: String,
    /// Delay between reachability probes.
    pub api_available_interval: Duration,
    /// Number of reachability probes before giving up.
    pub api_available_max_retries: u32,
    /// Delay between history polls when the worker drives a job itself.
    pub polling_interval: Duration,
    /// Poll budget for a single job driven by the local runner.
    pub polling_max_retries: u32,
    /// Root directory ComfyUI writes outputs into.
    pub output_path: PathBuf,
    /// Ask the runtime to recycle the worker after a terminal result.
    pub refresh_worker: bool,
    /// Per-request timeout for calls to ComfyUI.
    pub request_timeout: Duration,
    /// Tracked jobs older than this are evicted from the prompt store.
    pub prompt_ttl: Duration,
    /// Consecutive failed history polls tolerated before a job is failed.
    /// `None` keeps polling indefinitely.
    pub poll_failure_limit: Option<u32>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            comfy_url: "http://127.0.0.1:8188".to_string(),
            api_available_interval: Duration::from_millis(50),
            api_available_max_retries: 500,
            polling_interval: Duration::from_millis(250),
            polling_max_retries: 500,
            output_path: PathBuf::from("/comfyui/output"),
            refresh_worker: false,
            request_timeout: Duration::from_secs(30),
            prompt_ttl: Duration::from_secs(3600),
            poll_failure_limit: None,
        }
    }
}

impl HandlerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default                  |
    /// |-----------------------------------|--------------------------|
    /// | `COMFY_HOST`                      | `http://127.0.0.1:8188`  |
    /// | `COMFY_API_AVAILABLE_INTERVAL_MS` | `50`                     |
    /// | `COMFY_API_AVAILABLE_MAX_RETRIES` | `500`                    |
    /// | `COMFY_POLLING_INTERVAL_MS`       | `250`                    |
    /// | `COMFY_POLLING_MAX_RETRIES`       | `500`                    |
    /// | `COMFY_OUTPUT_PATH`               | `/comfyui/output`        |
    /// | `REFRESH_WORKER`                  | `false`                  |
    /// | `COMFY_REQUEST_TIMEOUT_SECS`      | `30`                     |
    /// | `PROMPT_TTL_SECS`                 | `3600`                   |
    /// | `COMFY_POLL_FAILURE_LIMIT`        | unset                    |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup, then validate it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let comfy_url = lookup("COMFY_HOST")
            .map(|host| normalize_url(&host))
            .unwrap_or(defaults.comfy_url);

        let config = Self {
            comfy_url,
            api_available_interval: Duration::from_millis(parse_or(
                &lookup,
                "COMFY_API_AVAILABLE_INTERVAL_MS",
                defaults.api_available_interval.as_millis() as u64,
            )?),
            api_available_max_retries: parse_or(
                &lookup,
                "COMFY_API_AVAILABLE_MAX_RETRIES",
                defaults.api_available_max_retries,
            )?,
            polling_interval: Duration::from_millis(parse_or(
                &lookup,
                "COMFY_POLLING_INTERVAL_MS",
                defaults.polling_interval.as_millis() as u64,
            )?),
            polling_max_retries: parse_or(
                &lookup,
                "COMFY_POLLING_MAX_RETRIES",
                defaults.polling_max_retries,
            )?,
            output_path: lookup("COMFY_OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_path),
            refresh_worker: lookup("REFRESH_WORKER")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.refresh_worker),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "COMFY_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            prompt_ttl: Duration::from_secs(parse_or(
                &lookup,
                "PROMPT_TTL_SECS",
                defaults.prompt_ttl.as_secs(),
            )?),
            poll_failure_limit: match lookup("COMFY_POLL_FAILURE_LIMIT") {
                Some(raw) => Some(parse_value("COMFY_POLL_FAILURE_LIMIT", &raw)?),
                None => None,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// Rules:
    /// - URL must use `http` or `https`.
    /// - Retry counts and the failure limit must be at least 1.
    /// - Intervals, timeout, and TTL must be non-zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.comfy_url.starts_with("http://") || self.comfy_url.starts_with("https://")) {
            return Err(CoreError::Config(format!(
                "COMFY_HOST must be an http(s) URL, got \"{}\"",
                self.comfy_url
            )));
        }
        if self.comfy_url.trim_end_matches('/').ends_with(':') || self.host_part().is_empty() {
            return Err(CoreError::Config(format!(
                "COMFY_HOST has no host: \"{}\"",
                self.comfy_url
            )));
        }
        if self.api_available_max_retries == 0 {
            return Err(CoreError::Config(
                "COMFY_API_AVAILABLE_MAX_RETRIES must be at least 1".to_string(),
            ));
        }
        if self.polling_max_retries == 0 {
            return Err(CoreError::Config(
                "COMFY_POLLING_MAX_RETRIES must be at least 1".to_string(),
            ));
        }
        if self.api_available_interval.is_zero() || self.polling_interval.is_zero() {
            return Err(CoreError::Config(
                "Polling intervals must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(CoreError::Config(
                "COMFY_REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.prompt_ttl.is_zero() {
            return Err(CoreError::Config(
                "PROMPT_TTL_SECS must be greater than zero".to_string(),
            ));
        }
        if self.poll_failure_limit == Some(0) {
            return Err(CoreError::Config(
                "COMFY_POLL_FAILURE_LIMIT must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    fn host_part(&self) -> &str {
        self.comfy_url
            .split_once("://")
            .map(|(_, rest)| rest.trim_end_matches('/'))
            .unwrap_or_default()
    }
}

/// Accept both `host:port` and full URLs for `COMFY_HOST`.
fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, CoreError> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{key} has an invalid value: \"{raw}\"")))
}
