//! Background cache expiry sweeper.
//!
//! A maintenance task, not part of the request path: it shares nothing with
//! request handling except the cache directory itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use sitesnap_core::{CacheStore, Metrics};

/// Periodically purge expired entries until the task is dropped.
pub async fn run(store: Arc<CacheStore>, every: Duration, metrics: Arc<Metrics>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval fires immediately; the first real sweep waits one period.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        sweep(&store, &metrics).await;
    }
}

/// One sweep pass. Failures are logged, never fatal to the task.
pub async fn sweep(store: &CacheStore, metrics: &Metrics) {
    match store.purge_expired().await {
        Ok(0) => tracing::debug!("sweep: nothing expired"),
        Ok(evicted) => {
            let total = metrics.record_evictions(evicted);
            tracing::info!(evicted, total, "sweep evicted stale entries");
        }
        Err(err) => tracing::warn!(error = %err, "sweep failed"),
    }
}
