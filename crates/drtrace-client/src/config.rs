//! Client configuration resolution.
//!
//! Resolution priority, highest first:
//! 1. `DRTRACE_*` environment variables
//! 2. `_drtrace/config.json` at the working directory or one of its ancestors
//! 3. built-in defaults
//!
//! Resolution happens once, at client construction; the result is an
//! immutable snapshot. Invalid or unparsable values fall back to the next
//! source without failing the process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lib_env_parse::{env_opt, env_parse_opt, is_falsy};
use lib_log_types::LogLevel;
use serde::Deserialize;

/// Name of the per-project configuration directory.
pub const CONFIG_DIR: &str = "_drtrace";

/// Name of the configuration file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.json";

/// Immutable client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Application key attached to every record
    pub application_id: String,
    /// Full ingest endpoint URL
    pub daemon_url: String,
    /// Optional coarse grouping attached to every record
    pub service_name: Option<String>,
    /// When false, all log calls are no-ops
    pub enabled: bool,
    /// Records below this level are dropped before buffering
    pub min_level: LogLevel,
    /// Buffer size that triggers an immediate flush
    pub batch_size: usize,
    /// Time-triggered flush period
    pub flush_interval: Duration,
    /// Bounded-buffer capacity; 0 means unbounded (discouraged)
    pub max_buffer_size: usize,
    /// Per-attempt transport deadline
    pub http_timeout: Duration,
    /// Base backoff; attempt n sleeps `retry_backoff * n`
    pub retry_backoff: Duration,
    /// Total delivery attempts per batch
    pub max_retries: u32,
    /// Cooldown between probe attempts while the circuit is open
    pub circuit_reset_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            application_id: "my-app".to_string(),
            daemon_url: "http://localhost:8001/logs/ingest".to_string(),
            service_name: None,
            enabled: true,
            min_level: LogLevel::Debug,
            batch_size: 10,
            flush_interval: Duration::from_millis(5000),
            max_buffer_size: 10_000,
            http_timeout: Duration::from_millis(1000),
            retry_backoff: Duration::from_millis(100),
            max_retries: 3,
            circuit_reset_interval: Duration::from_millis(30_000),
        }
    }
}

/// On-disk shape of `_drtrace/config.json`. All keys optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    application_id: Option<String>,
    daemon_url: Option<String>,
    service_name: Option<String>,
    enabled: Option<bool>,
    min_level: Option<String>,
    batch_size: Option<usize>,
    /// Milliseconds
    flush_interval: Option<u64>,
    max_buffer_size: Option<usize>,
    /// Milliseconds
    http_timeout: Option<u64>,
    /// Milliseconds
    retry_backoff: Option<u64>,
    max_retries: Option<u32>,
    /// Milliseconds
    circuit_reset_interval: Option<u64>,
}

impl FileConfig {
    /// Walk `start` and its ancestors for `_drtrace/config.json`.
    ///
    /// Any read or parse failure yields the empty config; a project without
    /// a config file is the normal case, not an error.
    fn discover(start: &Path) -> Self {
        for dir in start.ancestors() {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }
        Self::default()
    }

    fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("ignoring malformed {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("cannot read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

impl ClientConfig {
    /// Resolve configuration from the environment, the project config file
    /// discovered from the current working directory, and defaults.
    pub fn resolve() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::resolve_from(&cwd)
    }

    /// Resolve with the config-file search rooted at `dir`.
    pub fn resolve_from(dir: &Path) -> Self {
        let file = FileConfig::discover(dir);
        let defaults = Self::default();

        let min_level = env_opt("DRTRACE_MIN_LEVEL")
            .and_then(|v| {
                let parsed = LogLevel::from_str(&v);
                if parsed.is_none() {
                    tracing::warn!("ignoring unknown DRTRACE_MIN_LEVEL {:?}", v);
                }
                parsed
            })
            .or_else(|| file.min_level.as_deref().and_then(LogLevel::from_str))
            .unwrap_or(defaults.min_level);

        let enabled = match env_opt("DRTRACE_ENABLED") {
            Some(v) => !is_falsy(&v),
            None => file.enabled.unwrap_or(defaults.enabled),
        };

        Self {
            application_id: env_opt("DRTRACE_APPLICATION_ID")
                .or(file.application_id)
                .unwrap_or(defaults.application_id),
            daemon_url: env_opt("DRTRACE_DAEMON_URL")
                .or(file.daemon_url)
                .unwrap_or(defaults.daemon_url),
            service_name: env_opt("DRTRACE_SERVICE_NAME").or(file.service_name),
            enabled,
            min_level,
            batch_size: file.batch_size.unwrap_or(defaults.batch_size),
            flush_interval: file
                .flush_interval
                .map(Duration::from_millis)
                .unwrap_or(defaults.flush_interval),
            max_buffer_size: env_parse_opt("DRTRACE_MAX_BUFFER_SIZE")
                .or(file.max_buffer_size)
                .unwrap_or(defaults.max_buffer_size),
            http_timeout: env_parse_opt("DRTRACE_HTTP_TIMEOUT_MS")
                .map(Duration::from_millis)
                .or(file.http_timeout.map(Duration::from_millis))
                .unwrap_or(defaults.http_timeout),
            retry_backoff: env_parse_opt("DRTRACE_RETRY_BACKOFF_MS")
                .map(Duration::from_millis)
                .or(file.retry_backoff.map(Duration::from_millis))
                .unwrap_or(defaults.retry_backoff),
            max_retries: env_parse_opt("DRTRACE_MAX_RETRIES")
                .or(file.max_retries)
                .unwrap_or(defaults.max_retries),
            circuit_reset_interval: env_parse_opt("DRTRACE_CIRCUIT_RESET_MS")
                .map(Duration::from_millis)
                .or(file.circuit_reset_interval.map(Duration::from_millis))
                .unwrap_or(defaults.circuit_reset_interval),
        }
    }
}
