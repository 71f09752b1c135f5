//! Retention worker: periodically expires records older than the
//! configured window. Runs on its own schedule and never blocks ingest or
//! query handlers; each sweep is one bounded DELETE.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::store::LogStore;

/// Default sweep period.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(3600);

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Spawn the retention loop.
pub fn spawn(
    store: Arc<LogStore>,
    retention_days: u32,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // the first tick fires immediately; skip it
        interval.tick().await;
        loop {
            interval.tick().await;
            let cutoff = now_ts() - retention_days as f64 * SECONDS_PER_DAY;
            match store.purge_older_than(cutoff).await {
                Ok(0) => tracing::debug!("retention sweep: nothing expired"),
                Ok(removed) => tracing::info!("retention sweep removed {} records", removed),
                Err(e) => tracing::error!("retention sweep failed: {}", e),
            }
        }
    })
}

fn now_ts() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
