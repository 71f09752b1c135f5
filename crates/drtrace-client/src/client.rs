//! The client public API: record builders, the level gate and the
//! background flush worker.
//!
//! Lifecycle contract: the flush worker is started on construction (when
//! the client is enabled), woken by the flush interval, an explicit
//! `flush()` or a size-triggered signal, and joined - never detached - on
//! drop. The worker holds no lock while doing network I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use lib_log_types::{LogLevel, LogRecord};
use serde::Serialize;

use crate::buffer::BoundedBuffer;
use crate::config::ClientConfig;
use crate::transport::HttpTransport;

/// Current wall-clock time as UTC seconds since the Unix epoch.
///
/// f64 keeps microsecond resolution for any realistic epoch value.
fn unix_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

struct ClientInner {
    config: ClientConfig,
    buffer: BoundedBuffer,
    transport: HttpTransport,
    stop: AtomicBool,
    wake: (Mutex<bool>, Condvar),
}

impl ClientInner {
    fn signal_flush(&self) {
        let (lock, cvar) = &self.wake;
        let mut requested = lock.lock().unwrap_or_else(|e| e.into_inner());
        *requested = true;
        cvar.notify_one();
    }

    /// Drain the buffer and hand the batch to the transport.
    ///
    /// The buffer mutex is released before any I/O happens; a failed batch
    /// is dropped (the circuit breaker is the backpressure signal).
    fn flush_once(&self) {
        let records = self.buffer.drain();
        if records.is_empty() {
            return;
        }
        let count = records.len();
        if !self.transport.send_batch(&self.config.application_id, records) {
            tracing::debug!("dropped undeliverable batch of {} records", count);
        }
    }

    fn run_flusher(&self) {
        loop {
            {
                let (lock, cvar) = &self.wake;
                let mut requested = lock.lock().unwrap_or_else(|e| e.into_inner());
                if !*requested && !self.stop.load(Ordering::Acquire) {
                    let (guard, _timeout) = cvar
                        .wait_timeout(requested, self.config.flush_interval)
                        .unwrap_or_else(|e| e.into_inner());
                    requested = guard;
                }
                *requested = false;
            }
            if self.stop.load(Ordering::Acquire) {
                // remaining records are flushed inline after the join
                return;
            }
            self.flush_once();
        }
    }
}

/// Handle into the DrTrace pipeline.
///
/// Log calls never block on network I/O and never return errors; delivery
/// happens on the client's background worker. Dropping the client stops the
/// worker, joins it, performs a final flush and tears the transport down.
pub struct DrTraceClient {
    inner: Arc<ClientInner>,
    worker: Option<JoinHandle<()>>,
}

impl DrTraceClient {
    /// Create a client with configuration resolved from the environment,
    /// the project's `_drtrace/config.json`, and defaults.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::resolve())
    }

    /// Create a client with an explicit configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        let inner = Arc::new(ClientInner {
            buffer: BoundedBuffer::new(config.max_buffer_size),
            transport: HttpTransport::new(&config),
            stop: AtomicBool::new(false),
            wake: (Mutex::new(false), Condvar::new()),
            config,
        });

        let worker = if inner.config.enabled {
            let worker_inner = Arc::clone(&inner);
            std::thread::Builder::new()
                .name("drtrace-flusher".to_string())
                .spawn(move || worker_inner.run_flusher())
                .map_err(|e| {
                    tracing::warn!("failed to start flush worker: {}", e);
                    e
                })
                .ok()
        } else {
            None
        };

        Self { inner, worker }
    }

    /// Start building a record at `level`. Call `.send()` to enqueue it.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> LogRecordBuilder<'_> {
        LogRecordBuilder::new(&self.inner, level, message.into())
    }

    pub fn debug(&self, message: impl Into<String>) -> LogRecordBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: impl Into<String>) -> LogRecordBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: impl Into<String>) -> LogRecordBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: impl Into<String>) -> LogRecordBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn critical(&self, message: impl Into<String>) -> LogRecordBuilder<'_> {
        self.log(LogLevel::Critical, message)
    }

    /// Synchronously drain the buffer and attempt delivery.
    ///
    /// Blocks the caller through the transport's bounded retry cycle. Safe
    /// to call at any point, including during shutdown; never fails.
    pub fn flush(&self) {
        self.inner.flush_once();
    }

    /// Whether log calls do anything at all.
    pub fn is_enabled(&self) -> bool {
        self.inner.config.enabled
    }

    /// Records currently buffered and awaiting delivery.
    pub fn pending(&self) -> usize {
        self.inner.buffer.len()
    }

    /// Records evicted by drop-oldest backpressure since construction.
    pub fn dropped_records(&self) -> u64 {
        self.inner.buffer.dropped()
    }

    /// The resolved configuration snapshot.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[cfg(test)]
    pub(crate) fn circuit_open(&self) -> bool {
        self.inner.transport.breaker().is_open()
    }
}

impl Default for DrTraceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DrTraceClient {
    fn drop(&mut self) {
        self.inner.stop.store(true, Ordering::Release);
        self.inner.signal_flush();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        // final inline flush now that the worker is gone
        self.inner.flush_once();
        self.inner.transport.shutdown();
    }
}

/// Fluent builder for one log record.
///
/// Nothing happens until `.send()`; a builder dropped without sending
/// records nothing.
pub struct LogRecordBuilder<'a> {
    inner: &'a Arc<ClientInner>,
    level: LogLevel,
    message: String,
    module_name: Option<String>,
    file_path: Option<String>,
    line_no: Option<u32>,
    exception_type: Option<String>,
    stacktrace: Option<String>,
    context: std::collections::HashMap<String, serde_json::Value>,
}

impl<'a> LogRecordBuilder<'a> {
    fn new(inner: &'a Arc<ClientInner>, level: LogLevel, message: String) -> Self {
        Self {
            inner,
            level,
            message,
            module_name: None,
            file_path: None,
            line_no: None,
            exception_type: None,
            stacktrace: None,
            context: Default::default(),
        }
    }

    /// Logical source of the record (logger name, component).
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module_name = Some(module.into());
        self
    }

    /// Source file and line.
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file_path = Some(file.into());
        self.line_no = Some(line);
        self
    }

    /// Enclosing function name, carried in the record context.
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.context
            .insert("function".to_string(), serde_json::Value::String(function.into()));
        self
    }

    /// Exception class name and stack trace.
    pub fn with_exception(mut self, kind: impl Into<String>, stacktrace: impl Into<String>) -> Self {
        self.exception_type = Some(kind.into());
        self.stacktrace = Some(stacktrace.into());
        self
    }

    /// Attach a free-form context value. Unserializable values are skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Stamp and enqueue the record.
    ///
    /// No-op when the client is disabled or the level is below the
    /// configured floor. Never blocks on I/O and never fails; an enqueue
    /// that fills the buffer to the batch threshold signals the flush
    /// worker.
    pub fn send(self) {
        let config = &self.inner.config;
        if !config.enabled {
            return;
        }
        if self.level < config.min_level {
            return;
        }

        let mut context = self.context;
        context
            .entry("language".to_string())
            .or_insert_with(|| serde_json::Value::String("rust".to_string()));
        context.insert(
            "thread_id".to_string(),
            serde_json::Value::String(format!("{:?}", std::thread::current().id())),
        );

        let record = LogRecord {
            ts: unix_ts(),
            level: self.level,
            message: self.message,
            application_id: config.application_id.clone(),
            module_name: self.module_name.unwrap_or_else(|| "app".to_string()),
            service_name: config.service_name.clone(),
            file_path: self.file_path,
            line_no: self.line_no,
            exception_type: self.exception_type,
            stacktrace: self.stacktrace,
            context,
        };

        let len = self.inner.buffer.push(record);
        if config.batch_size > 0 && len >= config.batch_size {
            self.inner.signal_flush();
        }
    }
}
