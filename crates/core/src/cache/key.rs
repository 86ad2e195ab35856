//! Cache key derivation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Which part of the request URL identifies a cache artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyPolicy {
    /// One artifact per host. Path variants of the same site share an entry,
    /// trading exactness for fewer captures.
    #[default]
    Host,

    /// One artifact per exact URL, keyed by SHA-256 of the URL string.
    FullUrl,
}

/// Derive the cache key for a validated URL.
///
/// Pure and deterministic: the same URL under the same policy always yields
/// the same key, and the output is filesystem-safe. A URL with no host (which
/// validation upstream should have rejected) falls back to the URL hash.
pub fn cache_key(url: &Url, policy: KeyPolicy) -> String {
    match policy {
        KeyPolicy::Host => match url.host_str() {
            Some(host) => sanitize(host),
            None => hash_url(url),
        },
        KeyPolicy::FullUrl => hash_url(url),
    }
}

/// Keep `[A-Za-z0-9.-]`, map everything else to `-`.
///
/// IPv6 hosts carry brackets and colons, which are not safe in file names on
/// every platform.
fn sanitize(host: &str) -> String {
    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '-' })
        .collect()
}

fn hash_url(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
