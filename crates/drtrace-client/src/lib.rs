//! DrTrace client library.
//!
//! Collects application log records, buffers them locally and ships them in
//! batches to the host-local DrTrace daemon. The pipeline is designed so
//! that logging can never hurt the application:
//! - log calls never block on network I/O and never return errors
//! - the buffer is bounded, evicting the oldest record under pressure
//! - a circuit breaker fast-fails delivery while the daemon is down
//! - one background worker per client drains the buffer and is joined
//!   (never detached) on drop
//!
//! # Usage
//!
//! ```rust,no_run
//! use drtrace_client::{DrTraceClient, LogLevel};
//!
//! // Configuration resolves from DRTRACE_* env vars, then the project's
//! // _drtrace/config.json, then built-in defaults.
//! let client = DrTraceClient::new();
//!
//! client.info("user logged in")
//!     .with_module("auth")
//!     .with_context("user_id", 123)
//!     .send();
//!
//! client.log(LogLevel::Error, "payment declined")
//!     .with_location(file!(), line!())
//!     .send();
//!
//! // Synchronous drain + delivery attempt
//! client.flush();
//! ```

mod buffer;
mod breaker;
mod client;
mod config;
mod transport;

pub use client::{DrTraceClient, LogRecordBuilder};
pub use config::ClientConfig;
pub use lib_log_types::{LogBatch, LogLevel, LogRecord};

/// Log with the caller's module path and source location stamped in.
#[macro_export]
macro_rules! drtrace_log {
    ($client:expr, $level:expr, $msg:expr) => {
        $client
            .log($level, $msg)
            .with_module(module_path!())
            .with_location(file!(), line!())
    };
}
