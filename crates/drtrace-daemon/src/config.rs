//! Daemon configuration from the environment.

use std::path::PathBuf;

use lib_env_parse::{env_clamped, env_or, env_parse, env_vars};

env_vars! {
    Host          => "DRTRACE_DAEMON_HOST",
    Port          => "DRTRACE_DAEMON_PORT",
    RetentionDays => "DRTRACE_RETENTION_DAYS",
    DbPath        => "DRTRACE_DB_PATH",
}

/// Allowed retention window, in days.
pub const RETENTION_DAYS_MIN: i64 = 1;
pub const RETENTION_DAYS_MAX: i64 = 365;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Records older than this many days are expired
    pub retention_days: u32,
    /// SQLite database location
    pub db_path: PathBuf,
}

impl DaemonConfig {
    /// Read configuration from `DRTRACE_*` environment variables, falling
    /// back to defaults on anything missing or unparsable.
    pub fn from_env() -> Self {
        Self {
            host: env_or(EnvVar::Host.as_str(), "127.0.0.1"),
            port: env_parse(EnvVar::Port.as_str(), 8001),
            retention_days: env_clamped(
                EnvVar::RetentionDays.as_str(),
                7,
                RETENTION_DAYS_MIN,
                RETENTION_DAYS_MAX,
            ) as u32,
            db_path: PathBuf::from(env_or(EnvVar::DbPath.as_str(), "_drtrace/logs.db")),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            retention_days: 7,
            db_path: PathBuf::from("_drtrace/logs.db"),
        }
    }
}
