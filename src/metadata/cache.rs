//! In-memory, time-bound response cache.
//!
//! Caches parsed provider responses so repeated lookups for the same query do
//! not cost a request against the provider's rate budget.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Default TTL for catalog metadata, which changes slowly.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Entry in the response cache.
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe key/value cache with one fixed TTL per instance.
///
/// Keys are opaque: the cache does no normalization, so callers build keys
/// with [`cache_key`] to make equivalent queries collide. Expired entries read
/// as absent and are dropped on access; [`purge_expired`](Self::purge_expired)
/// sweeps the rest.
pub struct ResponseCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> ResponseCache<V> {
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Look up `key`, treating expired entries as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }

        // Either missing or stale; drop the stale entry if it is still there.
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(key.into(), entry);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    /// Number of stored entries, including any not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Build a cache key from a provider id, a content kind, and the identifying
/// parameters of a request.
///
/// Parameters are trimmed, lowercased, and have inner whitespace collapsed, so
/// `"  The  Matrix"` and `"the matrix"` share a key. Empty parameters are
/// skipped.
pub fn cache_key(provider: &str, kind: &str, params: &[&str]) -> String {
    let mut key = format!("{provider}_{kind}");
    for param in params {
        let normalized = param
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if normalized.is_empty() {
            continue;
        }
        key.push('_');
        key.push_str(&normalized);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get_round_trips() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("tmdb_movie_inception", serde_json::json!({"results": [1, 2]}));

        assert_eq!(
            cache.get("tmdb_movie_inception"),
            Some(serde_json::json!({"results": [1, 2]}))
        );
        assert_eq!(cache.get("tmdb_movie_other"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = ResponseCache::new(Duration::from_millis(500));
        cache.set("key", 7u32);

        tokio::time::advance(Duration::from_millis(499)).await;
        assert_eq!(cache.get("key"), Some(7));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("key"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_refreshes_expiry() {
        let cache = ResponseCache::new(Duration::from_millis(500));
        cache.set("key", 1u32);
        tokio::time::advance(Duration::from_millis(400)).await;
        cache.set("key", 2u32);
        tokio::time::advance(Duration::from_millis(400)).await;

        assert_eq!(cache.get("key"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = ResponseCache::new(Duration::from_millis(100));
        cache.set("a", 1u32);
        cache.set("b", 2u32);
        assert_eq!(cache.len(), 2);

        tokio::time::advance(Duration::from_millis(150)).await;
        cache.purge_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("a", 1u32);
        cache.set("b", 2u32);
        cache.clear();

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_key_normalization() {
        assert_eq!(
            cache_key("tmdb", "movie", &["  The  Matrix ", "1999"]),
            "tmdb_movie_the matrix_1999"
        );
        assert_eq!(
            cache_key("tmdb", "movie", &["the matrix", "1999"]),
            cache_key("tmdb", "movie", &["THE MATRIX", "1999"])
        );
        assert_eq!(cache_key("fanarttv", "movie", &["27205", ""]), "fanarttv_movie_27205");
    }
}
