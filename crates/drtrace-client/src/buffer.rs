//! Bounded FIFO record buffer.
//!
//! Enqueue is safe from arbitrary user threads. When the buffer is at
//! capacity, the oldest record is evicted to make room for the new one
//! (drop-oldest). Eviction is silent; a counter is kept but never surfaced
//! as an error.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use lib_log_types::LogRecord;

pub(crate) struct BoundedBuffer {
    inner: Mutex<VecDeque<LogRecord>>,
    /// 0 means unbounded
    capacity: usize,
    dropped: AtomicU64,
}

impl BoundedBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue a record, evicting the oldest one at capacity.
    ///
    /// Returns the buffer length after the push so the caller can decide
    /// whether to signal a size-triggered flush. Never blocks on I/O.
    pub fn push(&self, record: LogRecord) -> usize {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if self.capacity > 0 && queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(record);
        queue.len()
    }

    /// Swap the buffered records out atomically.
    ///
    /// The mutex is released before the caller does any I/O; concurrent
    /// enqueues accumulate into the fresh queue.
    pub fn drain(&self) -> Vec<LogRecord> {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *queue).into()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Records evicted by drop-oldest since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_log_types::LogLevel;

    fn record(n: usize) -> LogRecord {
        LogRecord {
            ts: n as f64,
            level: LogLevel::Info,
            message: format!("m{n}"),
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

    #[test]
    fn fifo_order_preserved() {
        let buf = BoundedBuffer::new(10);
        for n in 0..5 {
            buf.push(record(n));
        }
        let drained = buf.drain();
        let messages: Vec<_> = drained.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["m0", "m1", "m2", "m3", "m4"]);
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn drop_oldest_at_capacity() {
        let buf = BoundedBuffer::new(3);
        for n in 0..10 {
            let len = buf.push(record(n));
            assert!(len <= 3);
        }
        assert_eq!(buf.dropped(), 7);
        let drained = buf.drain();
        let messages: Vec<_> = drained.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["m7", "m8", "m9"]);
    }

    #[test]
    fn zero_capacity_is_unbounded() {
        let buf = BoundedBuffer::new(0);
        for n in 0..1000 {
            buf.push(record(n));
        }
        assert_eq!(buf.len(), 1000);
        assert_eq!(buf.dropped(), 0);
    }

    #[test]
    fn push_reports_post_push_length() {
        let buf = BoundedBuffer::new(0);
        assert_eq!(buf.push(record(0)), 1);
        assert_eq!(buf.push(record(1)), 2);
    }

    #[test]
    fn concurrent_pushes_stay_bounded() {
        use std::sync::Arc;

        let buf = Arc::new(BoundedBuffer::new(100));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let buf = Arc::clone(&buf);
                std::thread::spawn(move || {
                    for n in 0..500 {
                        buf.push(record(t * 1000 + n));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.dropped(), 8 * 500 - 100);
    }
}
