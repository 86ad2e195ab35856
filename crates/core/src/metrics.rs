//! Process-wide capture metrics.
//!
//! A shared handle passed into the orchestrator and the sweeper. Counters are
//! plain atomics; there is no export surface beyond log lines and
//! [`Metrics::snapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for the capture pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    hits: AtomicU64,
    misses: AtomicU64,
    capture_failures: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub capture_failures: u64,
    pub evictions: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a cache hit, returning the hit count including this one.
    ///
    /// The returned sequence number is what log lines display.
    pub fn record_hit(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a cache miss, returning the miss count including this one.
    pub fn record_miss(&self) -> u64 {
        self.misses.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a failed capture, returning the failure count including this one.
    pub fn record_capture_failure(&self) -> u64 {
        self.capture_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Add a sweep's eviction count, returning the running total.
    pub fn record_evictions(&self, evicted: u64) -> u64 {
        self.evictions.fetch_add(evicted, Ordering::Relaxed) + evicted
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
