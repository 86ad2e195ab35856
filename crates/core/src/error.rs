//! Unified error types for sitesnap.

/// Storage-layer faults.
///
/// None of these is allowed to fail a request on its own: read faults degrade
/// to a cache miss and write faults are logged and swallowed by the
/// orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cache directory could not be created or opened.
    #[error("cache directory unavailable: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Persisting a captured artifact failed.
    #[error("cache write failed for {key}: {source}")]
    CacheWrite {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Scanning the cache directory failed.
    #[error("cache scan failed: {0}")]
    CacheScan(#[source] std::io::Error),

    /// Removing a stored artifact failed.
    #[error("cache evict failed for {key}: {source}")]
    CacheEvict {
        key: String,
        #[source]
        source: std::io::Error,
    },
}
