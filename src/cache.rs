//! In-process memoization of serialized read-endpoint responses.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha1::{Digest, Sha1};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CAPACITY: usize = 512;
const DEFAULT_TTL_SECS: i64 = 30;

#[derive(Clone)]
struct CacheEntry {
    body: Arc<Vec<u8>>,
    etag: Arc<str>,
    expires_at: DateTime<Utc>,
}

/// Thread-safe memoization of serialized JSON bodies keyed by request shape.
///
/// Readers never block each other; writers only ever touch the single key
/// (or victim key) they're inserting or evicting.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    capacity: usize,
    ttl: Duration,
}

pub struct CacheLookup {
    pub body: Arc<Vec<u8>>,
    pub etag: Arc<str>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_CAPACITY, Duration::from_secs(DEFAULT_TTL_SECS as u64))
    }

    pub fn with_capacity_and_ttl(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
            capacity,
            ttl,
        }
    }

    /// Returns the cached body and ETag if an unexpired entry exists for `key`.
    pub fn get(&self, key: &str) -> Option<CacheLookup> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Utc::now() {
            return None;
        }
        Some(CacheLookup {
            body: entry.body.clone(),
            etag: entry.etag.clone(),
        })
    }

    /// Stores `body` under `key`, computing its weak ETag, and returns it.
    pub fn set(&self, key: String, body: Vec<u8>) -> Arc<str> {
        let etag: Arc<str> = Arc::from(weak_etag(&body));
        let expires_at = Utc::now() + chrono::Duration::from_std(self.ttl).unwrap();

        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.evict_earliest_expiry();
        }

        self.entries.insert(
            key,
            CacheEntry {
                body: Arc::new(body),
                etag: etag.clone(),
                expires_at,
            },
        );

        etag
    }

    fn evict_earliest_expiry(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes a weak ETag (`W/"<hex sha1>"`) for a response body.
pub fn weak_etag(body: &[u8]) -> String {
    let digest = Sha1::digest(body);
    format!("W/\"{}\"", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let cache = ResponseCache::new();
        let etag = cache.set("k".to_string(), b"hello".to_vec());
        let hit = cache.get("k").unwrap();
        assert_eq!(*hit.body, b"hello".to_vec());
        assert_eq!(hit.etag, etag);
    }

    #[test]
    fn expired_entry_is_absent() {
        let cache = ResponseCache::with_capacity_and_ttl(8, Duration::from_secs(0));
        cache.set("k".to_string(), b"hello".to_vec());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn evicts_earliest_expiry_at_capacity() {
        let cache = ResponseCache::with_capacity_and_ttl(2, Duration::from_secs(30));
        cache.set("a".to_string(), b"1".to_vec());
        std::thread::sleep(Duration::from_millis(5));
        cache.set("b".to_string(), b"2".to_vec());
        cache.set("c".to_string(), b"3".to_vec());

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn etag_is_weak_and_deterministic() {
        let a = weak_etag(b"payload");
        let b = weak_etag(b"payload");
        assert_eq!(a, b);
        assert!(a.starts_with("W/\""));
    }
}
