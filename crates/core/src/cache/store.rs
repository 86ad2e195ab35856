//! Disk-backed screenshot store.
//!
//! Every operation pays a storage round-trip; there is no in-memory index to
//! keep consistent with the directory contents.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use bytes::Bytes;

use crate::Error;

const ARTIFACT_SUFFIX: &str = ".png";

/// A stored screenshot together with its age at lookup time.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub bytes: Bytes,
    pub age: Duration,
}

/// Disk-backed store mapping cache keys to PNG artifacts.
///
/// One `<key>.png` file per entry under the cache directory; the file's
/// modification timestamp is the only freshness record. A zero-length or
/// corrupted file is indistinguishable from a valid one at this layer.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    freshness_window: Duration,
    tmp_seq: AtomicU64,
}

impl CacheStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>, freshness_window: Duration) -> Result<Self, Error> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(Error::CacheDir)?;
        Ok(Self { dir, freshness_window, tmp_seq: AtomicU64::new(0) })
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Whether an entry of the given age is still servable.
    ///
    /// Strict less-than: an entry exactly at the window boundary is stale.
    pub fn is_fresh(&self, age: Duration) -> bool {
        age < self.freshness_window
    }

    /// Path of the artifact for `key`.
    pub fn artifact_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}{ARTIFACT_SUFFIX}"))
    }

    /// Look up the stored artifact for `key`.
    ///
    /// Absence is a normal miss. An unreadable or otherwise damaged entry is
    /// also reported as absent so the caller falls through to a fresh capture
    /// instead of failing the request.
    pub async fn lookup(&self, key: &str) -> Option<CachedEntry> {
        let path = self.artifact_path(key);

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache stat failed, treating as miss");
                return None;
            }
        };

        let Some(age) = entry_age(&meta) else {
            tracing::warn!(key, "cache entry has no usable mtime, treating as miss");
            return None;
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(CachedEntry { bytes: Bytes::from(bytes), age }),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Persist `bytes` as the artifact for `key`, replacing any prior entry.
    ///
    /// The write lands in a uniquely named temp file and is renamed into
    /// place, so a concurrent [`CacheStore::lookup`] sees either the old
    /// artifact or the new one, never a partial write. The rename also stamps
    /// the mtime that becomes the entry's freshness record.
    pub async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), Error> {
        let path = self.artifact_path(key);
        let tmp = self.dir.join(format!(
            ".{key}.{}.{}.tmp",
            std::process::id(),
            self.tmp_seq.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(source) = tokio::fs::write(&tmp, bytes).await {
            return Err(Error::CacheWrite { key: key.to_string(), source });
        }
        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::CacheWrite { key: key.to_string(), source });
        }
        Ok(())
    }

    /// Remove the artifact for `key`. Evicting an absent key succeeds.
    pub async fn evict(&self, key: &str) -> Result<(), Error> {
        match tokio::fs::remove_file(self.artifact_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::CacheEvict { key: key.to_string(), source }),
        }
    }

    /// One pass over the store, yielding `(key, age)` for every artifact.
    ///
    /// Directories, dotfiles, in-flight temp files, and anything without the
    /// artifact suffix are skipped. No ordering guarantee.
    pub async fn enumerate(&self) -> Result<Vec<(String, Duration)>, Error> {
        let mut dir = tokio::fs::read_dir(&self.dir).await.map_err(Error::CacheScan)?;
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await.map_err(Error::CacheScan)? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            let Some(key) = name.strip_suffix(ARTIFACT_SUFFIX) else { continue };
            if key.is_empty() {
                continue;
            }
            // The entry may vanish between listing and stat; skip it.
            let Ok(meta) = entry.metadata().await else { continue };
            if !meta.is_file() {
                continue;
            }
            let Some(age) = entry_age(&meta) else { continue };
            entries.push((key.to_string(), age));
        }

        Ok(entries)
    }

    /// Evict every artifact at least as old as the freshness window.
    ///
    /// Each candidate is re-stat'ed immediately before removal so an entry
    /// rewritten mid-sweep is not evicted off the stale scan result. Per-entry
    /// failures are logged and skipped; one bad entry never aborts the pass.
    /// Returns the number of evicted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let mut evicted = 0u64;

        for (key, age) in self.enumerate().await? {
            if self.is_fresh(age) {
                continue;
            }
            if let Some(current) = self.age_of(&key).await
                && self.is_fresh(current)
            {
                continue;
            }
            match self.evict(&key).await {
                Ok(()) => evicted += 1,
                Err(err) => tracing::warn!(key, error = %err, "evict failed, skipping entry"),
            }
        }

        Ok(evicted)
    }

    async fn age_of(&self, key: &str) -> Option<Duration> {
        let meta = tokio::fs::metadata(self.artifact_path(key)).await.ok()?;
        entry_age(&meta)
    }
}

/// Age since last write. A file stamped in the future reads as age zero
/// rather than an error, which keeps clock skew from evicting live entries.
fn entry_age(meta: &std::fs::Metadata) -> Option<Duration> {
    let modified = meta.modified().ok()?;
    Some(SystemTime::now().duration_since(modified).unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const WINDOW: Duration = Duration::from_secs(60 * 60 * 24);

    async fn open_store(dir: &Path) -> CacheStore {
        CacheStore::open(dir, WINDOW).await.unwrap()
    }

    fn backdate(path: &Path, age: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn test_write_then_lookup_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        store.write("example.com", b"\x89PNG-bytes").await.unwrap();

        let entry = store.lookup("example.com").await.unwrap();
        assert_eq!(&entry.bytes[..], b"\x89PNG-bytes");
        assert!(store.is_fresh(entry.age));
    }

    #[tokio::test]
    async fn test_lookup_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        assert!(store.lookup("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn test_write_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        store.write("example.com", b"first version, longer").await.unwrap();
        store.write("example.com", b"second").await.unwrap();

        let entry = store.lookup("example.com").await.unwrap();
        assert_eq!(&entry.bytes[..], b"second");
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        store.write("example.com", b"bytes").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["example.com.png"]);
    }

    #[tokio::test]
    async fn test_freshness_boundary_is_strict() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        assert!(store.is_fresh(Duration::ZERO));
        assert!(store.is_fresh(WINDOW - Duration::from_secs(1)));
        assert!(!store.is_fresh(WINDOW));
        assert!(!store.is_fresh(WINDOW + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_evict_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        store.write("example.com", b"bytes").await.unwrap();
        store.evict("example.com").await.unwrap();
        store.evict("example.com").await.unwrap();
        store.evict("never-written").await.unwrap();

        assert!(store.lookup("example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_enumerate_skips_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        store.write("example.com", b"bytes").await.unwrap();
        std::fs::write(dir.path().join(".gitkeep"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not an artifact").unwrap();
        std::fs::write(dir.path().join(".example.com.1.0.tmp"), b"partial").unwrap();
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let entries = store.enumerate().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "example.com");
    }

    #[tokio::test]
    async fn test_purge_expired_exact_ages() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        for key in ["age-zero", "half-window", "at-window", "twice-window"] {
            store.write(key, key.as_bytes()).await.unwrap();
        }
        backdate(&store.artifact_path("half-window"), WINDOW / 2);
        backdate(&store.artifact_path("at-window"), WINDOW);
        backdate(&store.artifact_path("twice-window"), WINDOW * 2);

        let evicted = store.purge_expired().await.unwrap();
        assert_eq!(evicted, 2);

        let fresh = store.lookup("age-zero").await.unwrap();
        assert_eq!(&fresh.bytes[..], b"age-zero");
        let half = store.lookup("half-window").await.unwrap();
        assert_eq!(&half.bytes[..], b"half-window");
        assert!(store.lookup("at-window").await.is_none());
        assert!(store.lookup("twice-window").await.is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_spares_rewritten_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        store.write("example.com", b"old").await.unwrap();
        backdate(&store.artifact_path("example.com"), WINDOW * 2);

        // Rewritten before the purge runs; the fresh mtime must keep it.
        store.write("example.com", b"new").await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 0);
        let entry = store.lookup("example.com").await.unwrap();
        assert_eq!(&entry.bytes[..], b"new");
    }

    #[tokio::test]
    async fn test_corrupt_entry_falls_through_to_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        store.write("example.com", b"bytes").await.unwrap();
        let path = store.artifact_path("example.com");
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        // A directory where the artifact should be stats fine but fails to
        // read as a file; the store must report a miss, not an error.
        assert!(store.lookup("example.com").await.is_none());
    }
}
