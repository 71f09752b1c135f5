//! Typed environment variable parsing.
//!
//! Every helper in this crate shares one policy: a missing or unparsable
//! value falls back to the caller's default instead of failing the process.
//! Configuration mistakes must never take an application down with it.

use std::str::FromStr;

/// Declare an enum of environment variables with automatic `as_str()` mapping.
///
/// ```
/// # use lib_env_parse::env_vars;
/// env_vars! {
///     DaemonUrl => "DRTRACE_DAEMON_URL",
///     Port      => "DRTRACE_DAEMON_PORT",
/// }
/// assert_eq!(EnvVar::DaemonUrl.as_str(), "DRTRACE_DAEMON_URL");
/// ```
#[macro_export]
macro_rules! env_vars {
    ($($variant:ident => $name:literal),* $(,)?) => {
        enum EnvVar { $($variant),* }
        impl EnvVar {
            const fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $name),* }
            }
        }
    };
}

/// Parse a string as an explicit "off" value.
///
/// Falsy: `"false"`, `"0"`, `"no"`, `"off"` (case-insensitive). Intended
/// for default-true flags such as `DRTRACE_ENABLED`: only an explicitly
/// falsy value disables the feature, anything else leaves it on.
pub fn is_falsy(val: &str) -> bool {
    let v = val.trim();
    v.eq_ignore_ascii_case("false") || v == "0" || v.eq_ignore_ascii_case("no") || v.eq_ignore_ascii_case("off")
}

/// Read an env var as `Option<String>`.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Read an env var as `String`, falling back to a default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an env var, falling back to `default` when the variable
/// is unset or its value does not parse.
///
/// An unparsable value logs a warning naming the variable; it never fails.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("ignoring unparsable value {:?} for {}", raw, key);
                default
            }
        },
        Err(_) => default,
    }
}

/// Read and parse an env var as `Option<T>`.
///
/// Unset or unparsable values both yield `None`.
pub fn env_parse_opt<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring unparsable value {:?} for {}", raw, key);
            None
        }
    }
}

/// Read and parse an integer env var, clamping the result to `min..=max`.
///
/// Out-of-range values are clamped rather than rejected.
pub fn env_clamped(key: &str, default: i64, min: i64, max: i64) -> i64 {
    env_parse(key, default).clamp(min, max)
}
