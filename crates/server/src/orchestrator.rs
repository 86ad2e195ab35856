//! Hit-or-capture request orchestration.
//!
//! Composes key derivation, the disk store, and the capturer into the
//! request-serving decision: serve a fresh cached artifact, or capture,
//! persist best-effort, and serve the new bytes. Each request is stateless
//! beyond the shared store and metrics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::{Mutex, Semaphore};
use url::Url;

use sitesnap_client::{CaptureError, CaptureOptions, Capturer};
use sitesnap_core::{CacheStore, KeyPolicy, Metrics, cache_key};

/// How a request was satisfied. Observable via logs and metrics only; the
/// HTTP payload is identical either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

/// A served screenshot.
#[derive(Debug, Clone)]
pub struct Served {
    pub bytes: Bytes,
    pub outcome: CacheOutcome,
}

/// The only way a request can fail. Storage faults never appear here; they
/// degrade to a recapture or a skipped persist.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Orchestrates the cache-or-capture pipeline.
pub struct CaptureOrchestrator {
    store: Arc<CacheStore>,
    capturer: Arc<dyn Capturer>,
    capture_opts: CaptureOptions,
    key_policy: KeyPolicy,
    capture_slots: Semaphore,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    metrics: Arc<Metrics>,
}

impl CaptureOrchestrator {
    pub fn new(
        store: Arc<CacheStore>, capturer: Arc<dyn Capturer>, capture_opts: CaptureOptions, key_policy: KeyPolicy,
        max_concurrent_captures: usize, metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            capturer,
            capture_opts,
            key_policy,
            capture_slots: Semaphore::new(max_concurrent_captures),
            key_locks: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Serve a screenshot for `url`, from cache when fresh.
    ///
    /// Concurrent misses for the same key coalesce: one caller captures while
    /// the rest wait on the key guard, re-check the store, and are served the
    /// freshly written entry. Distinct keys proceed independently.
    pub async fn serve(&self, url: &Url) -> Result<Served, ServeError> {
        let key = cache_key(url, self.key_policy);

        let guard = self.key_guard(&key).await;
        let result = {
            let _held = guard.lock().await;
            self.serve_locked(url, &key).await
        };
        drop(guard);
        self.drop_idle_guard(&key).await;

        result
    }

    async fn serve_locked(&self, url: &Url, key: &str) -> Result<Served, ServeError> {
        if let Some(entry) = self.store.lookup(key).await
            && self.store.is_fresh(entry.age)
        {
            let hit = self.metrics.record_hit();
            tracing::info!(%url, key, age_secs = entry.age.as_secs(), hit, "cache hit");
            return Ok(Served { bytes: entry.bytes, outcome: CacheOutcome::Hit });
        }

        let started = Instant::now();
        let captured = {
            let _slot = self.capture_slots.acquire().await.expect("capture semaphore closed");
            self.capturer.capture(url, &self.capture_opts).await
        };

        let bytes = match captured {
            Ok(bytes) => bytes,
            Err(err) => {
                self.metrics.record_capture_failure();
                tracing::error!(%url, key, error = %err, "capture failed");
                return Err(err.into());
            }
        };

        // Best-effort persist: a storage hiccup never wastes the render.
        if let Err(err) = self.store.write(key, &bytes).await {
            tracing::warn!(key, error = %err, "cache write failed, serving uncached bytes");
        }

        let miss = self.metrics.record_miss();
        tracing::info!(%url, key, elapsed_secs = started.elapsed().as_secs(), miss, "captured");
        Ok(Served { bytes, outcome: CacheOutcome::Miss })
    }

    async fn key_guard(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Drop the per-key guard once nobody else holds a clone. A lost race
    /// here just means the next request re-creates the entry.
    async fn drop_idle_guard(&self, key: &str) {
        let mut locks = self.key_locks.lock().await;
        if let Some(guard) = locks.get(key)
            && Arc::strong_count(guard) == 1
        {
            locks.remove(key);
        }
    }
}
