//! LRU-with-TTL resource cache (spec §4.9/§8.8).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use cortex_types::ResourceContents;

/// Default max entry count (spec §4.9 "maximum size (default 1000)").
pub const DEFAULT_MAX_SIZE: usize = 1000;
/// Default per-entry TTL (spec §4.9 "per-entry TTL (default 15 minutes)").
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

struct Entry {
    contents: ResourceContents,
    inserted_at: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// Recency order, front = least recently used, back = most recently used.
    order: VecDeque<String>,
}

impl Inner {
    fn touch(&mut self, uri: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == uri) {
            self.order.remove(pos);
        }
        self.order.push_back(uri.to_string());
    }

    fn remove(&mut self, uri: &str) {
        self.entries.remove(uri);
        if let Some(pos) = self.order.iter().position(|k| k == uri) {
            self.order.remove(pos);
        }
    }
}

/// Snapshot of the cache's hit/miss/eviction counters (spec §4.9 "It records
/// hits, misses, evictions and exposes them as counters").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Per-resource-uri content cache: LRU eviction once `max_size` is exceeded,
/// per-entry expiry once `ttl` elapses (spec §4.9).
pub struct ResourceCache {
    inner: Mutex<Inner>,
    max_size: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResourceCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_size,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Fetch a still-fresh entry, touching its recency. Returns `None` (and
    /// records a miss) if the uri was never cached or its TTL has elapsed
    /// (spec §8.8 "a resource read after TTL is fetched anew").
    pub async fn get(&self, uri: &str) -> Option<ResourceContents> {
        let mut inner = self.inner.lock().await;
        let expired = inner.entries.get(uri).is_some_and(|e| e.inserted_at.elapsed() >= self.ttl);
        if expired {
            inner.remove(uri);
        }
        match inner.entries.get(uri) {
            Some(entry) => {
                let contents = entry.contents.clone();
                inner.touch(uri);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(contents)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or refresh an entry, evicting the least-recently-used one if
    /// this would exceed `max_size`.
    pub async fn insert(&self, uri: String, contents: ResourceContents) {
        let mut inner = self.inner.lock().await;
        let is_new = !inner.entries.contains_key(&uri);
        inner.entries.insert(uri.clone(), Entry { contents, inserted_at: Instant::now() });
        inner.touch(&uri);

        if is_new && inner.entries.len() > self.max_size {
            if let Some(lru_key) = inner.order.pop_front() {
                inner.entries.remove(&lru_key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(uri: &str, text: &str) -> ResourceContents {
        ResourceContents { uri: uri.to_string(), mime_type: None, text: text.to_string() }
    }

    #[tokio::test]
    async fn miss_then_hit_after_insert() {
        let cache = ResourceCache::new(10, Duration::from_secs(60));
        assert!(cache.get("file:///a.txt").await.is_none());
        cache.insert("file:///a.txt".to_string(), contents("file:///a.txt", "hello")).await;
        let hit = cache.get("file:///a.txt").await.unwrap();
        assert_eq!(hit.text, "hello");

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn evicts_least_recently_used_when_over_capacity() {
        let cache = ResourceCache::new(2, Duration::from_secs(60));
        cache.insert("a".to_string(), contents("a", "1")).await;
        cache.insert("b".to_string(), contents("b", "2")).await;
        // touch "a" so "b" becomes the least recently used.
        cache.get("a").await;
        cache.insert("c".to_string(), contents("c", "3")).await;

        assert!(cache.get("b").await.is_none());
        assert!(cache.get("a").await.is_some());
        assert!(cache.get("c").await.is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_treated_as_a_miss() {
        let cache = ResourceCache::new(10, Duration::from_millis(100));
        cache.insert("a".to_string(), contents("a", "1")).await;
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(cache.get("a").await.is_none());
    }
}
