//! Circuit breaker for daemon delivery.
//!
//! Three states: CLOSED (normal), OPEN (fast-fail without I/O) and an
//! implicit HALF_OPEN once the cooldown elapses, in which exactly one
//! caller wins the right to probe. The whole check is lock-free so the
//! fast-fail path costs a couple of atomic loads.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

const CLOSED: u8 = 0;
const OPEN: u8 = 1;

pub(crate) struct CircuitBreaker {
    state: AtomicU8,
    /// Monotonic milliseconds (from `origin`) before which no probe runs.
    open_until: AtomicU64,
    reset_interval: Duration,
    origin: Instant,
}

impl CircuitBreaker {
    pub fn new(reset_interval: Duration) -> Self {
        Self {
            state: AtomicU8::new(CLOSED),
            open_until: AtomicU64::new(0),
            reset_interval,
            origin: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn reset_ms(&self) -> u64 {
        self.reset_interval.as_millis() as u64
    }

    /// Whether a send may proceed.
    ///
    /// CLOSED always allows. OPEN denies until the armed timer elapses;
    /// after that the CAS elects a single probe winner per cooldown, so
    /// from first failure until recovery at most one request per
    /// `reset_interval` reaches the network.
    pub fn allow(&self) -> bool {
        if self.state.load(Ordering::Acquire) == CLOSED {
            return true;
        }
        let now = self.now_ms();
        let until = self.open_until.load(Ordering::Acquire);
        if now < until {
            return false;
        }
        // Timer elapsed: HALF_OPEN. Re-arm it; the CAS winner probes.
        self.open_until
            .compare_exchange(until, now + self.reset_ms(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// A batch reached the daemon with a 2xx response.
    pub fn on_success(&self) {
        self.state.store(CLOSED, Ordering::Release);
    }

    /// A batch exhausted all retries.
    pub fn on_failure(&self) {
        // Arm the timer before publishing OPEN so a reader that observes
        // OPEN also observes a valid deadline.
        self.open_until
            .store(self.now_ms() + self.reset_ms(), Ordering::Release);
        self.state.store(OPEN, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == OPEN
    }
}
