//! HTTP transport for batch delivery.
//!
//! One shared blocking HTTP handle per client, guarded by a mutex; the
//! handle is used end-to-end across an attempt and destroyed under the same
//! mutex at shutdown, so no in-flight I/O can race teardown. Delivery
//! failures never propagate: a batch either lands with a 2xx or is dropped
//! after bounded retries, opening the circuit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, TryLockError};
use std::time::{Duration, Instant};

use lib_log_types::{LogBatch, LogRecord};

use crate::breaker::CircuitBreaker;
use crate::config::ClientConfig;

pub(crate) struct HttpTransport {
    handle: Mutex<Option<reqwest::blocking::Client>>,
    breaker: CircuitBreaker,
    shutdown: AtomicBool,
    ingest_url: String,
    http_timeout: Duration,
    retry_backoff: Duration,
    max_retries: u32,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let handle = reqwest::blocking::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| {
                tracing::warn!("failed to build HTTP client, delivery disabled: {}", e);
                e
            })
            .ok();

        Self {
            handle: Mutex::new(handle),
            breaker: CircuitBreaker::new(config.circuit_reset_interval),
            shutdown: AtomicBool::new(false),
            ingest_url: config.daemon_url.clone(),
            http_timeout: config.http_timeout,
            retry_backoff: config.retry_backoff,
            max_retries: config.max_retries.max(1),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Deliver one batch. Returns whether the daemon acknowledged it.
    ///
    /// The caller must not re-enqueue on failure: the batch came out of a
    /// bounded buffer, and the open circuit is the backpressure signal.
    pub fn send_batch(&self, application_id: &str, records: Vec<LogRecord>) -> bool {
        if records.is_empty() {
            return true;
        }
        if self.shutdown.load(Ordering::Acquire) {
            return false;
        }
        if !self.breaker.allow() {
            return false;
        }

        let count = records.len();
        let payload = match serde_json::to_vec(&LogBatch {
            application_id: application_id.to_string(),
            logs: records,
        }) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("failed to serialize batch of {}: {}", count, e);
                return false;
            }
        };

        let guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if self.shutdown.load(Ordering::Acquire) {
            return false;
        }
        let Some(client) = guard.as_ref() else {
            return false;
        };

        for attempt in 1..=self.max_retries {
            if self.shutdown.load(Ordering::Acquire) {
                return false;
            }
            let result = client
                .post(&self.ingest_url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .timeout(self.http_timeout)
                .body(payload.clone())
                .send();
            match result {
                Ok(resp) if resp.status().is_success() => {
                    self.breaker.on_success();
                    tracing::trace!("delivered {} records to {}", count, self.ingest_url);
                    return true;
                }
                Ok(resp) => {
                    tracing::debug!(
                        "daemon rejected batch (attempt {}/{}): HTTP {}",
                        attempt,
                        self.max_retries,
                        resp.status()
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        "batch delivery failed (attempt {}/{}): {}",
                        attempt,
                        self.max_retries,
                        e
                    );
                }
            }
            if attempt < self.max_retries {
                std::thread::sleep(self.retry_backoff * attempt);
            }
        }

        self.breaker.on_failure();
        false
    }

    /// Tear the transport down.
    ///
    /// Sets the shutdown flag, then waits - bounded - for any in-flight
    /// attempt to release the handle mutex before destroying the handle
    /// under it. The bounded polling is an optimization; the final blocking
    /// acquisition is what guarantees no attempt uses a destroyed handle.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);

        let deadline = Instant::now() + self.http_timeout + Duration::from_millis(250);
        while Instant::now() < deadline {
            match self.handle.try_lock() {
                Ok(mut guard) => {
                    guard.take();
                    return;
                }
                Err(TryLockError::Poisoned(poisoned)) => {
                    poisoned.into_inner().take();
                    return;
                }
                Err(TryLockError::WouldBlock) => {
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        }

        let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_log_types::LogLevel;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn config_for(url: &str, max_retries: u32) -> ClientConfig {
        ClientConfig {
            daemon_url: url.to_string(),
            http_timeout: Duration::from_millis(200),
            retry_backoff: Duration::from_millis(5),
            max_retries,
            circuit_reset_interval: Duration::from_millis(100),
            ..ClientConfig::default()
        }
    }

    fn record() -> LogRecord {
        LogRecord {
            ts: 1.0,
            level: LogLevel::Info,
            message: "m".to_string(),
            application_id: "app".to_string(),
            module_name: "mod".to_string(),
            service_name: None,
            file_path: None,
            line_no: None,
            exception_type: None,
            stacktrace: None,
            context: Default::default(),
        }
    }

    /// Accept one connection and answer every request on it with `status`.
    fn one_shot_server(status: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 8192];
                let _ = stream.read(&mut buf);
                let response = format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/logs/ingest")
    }

    #[test]
    fn empty_batch_is_a_success_without_io() {
        let transport = HttpTransport::new(&config_for("http://127.0.0.1:1/logs/ingest", 1));
        assert!(transport.send_batch("app", vec![]));
        assert!(!transport.breaker().is_open());
    }

    #[test]
    fn accepted_batch_reports_success() {
        let url = one_shot_server("202 Accepted");
        let transport = HttpTransport::new(&config_for(&url, 1));
        assert!(transport.send_batch("app", vec![record()]));
        assert!(!transport.breaker().is_open());
    }

    #[test]
    fn exhausted_retries_open_the_circuit() {
        // port 1 is never listening; connection refused is immediate
        let transport = HttpTransport::new(&config_for("http://127.0.0.1:1/logs/ingest", 2));
        assert!(!transport.send_batch("app", vec![record()]));
        assert!(transport.breaker().is_open());

        // fast-fail without I/O while open
        let start = Instant::now();
        assert!(!transport.send_batch("app", vec![record()]));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn server_error_counts_as_failure() {
        let url = one_shot_server("500 Internal Server Error");
        let transport = HttpTransport::new(&config_for(&url, 1));
        assert!(!transport.send_batch("app", vec![record()]));
        assert!(transport.breaker().is_open());
    }

    #[test]
    fn recovery_goes_through_a_probe() {
        let transport_config = config_for("http://127.0.0.1:1/logs/ingest", 1);
        let transport = HttpTransport::new(&transport_config);
        assert!(!transport.send_batch("app", vec![record()]));
        assert!(transport.breaker().is_open());

        std::thread::sleep(Duration::from_millis(120));
        // cooldown elapsed: exactly one send reaches the network again
        assert!(!transport.send_batch("app", vec![record()]));
    }

    #[test]
    fn shutdown_short_circuits_sends() {
        let transport = HttpTransport::new(&config_for("http://127.0.0.1:1/logs/ingest", 3));
        transport.shutdown();
        assert!(transport.is_shutdown());
        let start = Instant::now();
        assert!(!transport.send_batch("app", vec![record()]));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let transport = HttpTransport::new(&config_for("http://127.0.0.1:1/logs/ingest", 1));
        transport.shutdown();
        transport.shutdown();
    }
}
