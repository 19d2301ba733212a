//! Request-addressed cache key generation.

use sha2::{Digest, Sha256};
use url::Url;

/// Normalize a URL for use as a cache key: the fragment never reaches the network.
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.to_string()
}

/// Compute the cache key for a request.
pub fn compute_entry_key(method: &str, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_url(url).as_bytes());
    hex::encode(hasher.finalize())
}
