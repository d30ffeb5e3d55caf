//! Rendered-page storage.
//!
//! An LRU-bounded map of request path to rendered body, with a per-entry
//! freshness window. Entries leave the cache through explicit stale-marks,
//! LRU eviction, the background sweep, or by aging past the window at read
//! time.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::{counter, gauge};

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};
use super::{MarkStaleError, StaleMarker};

const SOURCE: &str = "cache::store";

const METRIC_HIT: &str = "balera_page_cache_hit_total";
const METRIC_MISS: &str = "balera_page_cache_miss_total";
const METRIC_EVICT: &str = "balera_page_cache_evict_total";
const METRIC_ENTRIES: &str = "balera_page_cache_entries";

/// A cached rendered page.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub body: Bytes,
    pub content_type: String,
    pub stored_at: Instant,
}

impl CachedPage {
    pub fn new(body: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            body,
            content_type: content_type.into(),
            stored_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// In-memory rendered-page cache keyed by request path.
pub struct PageCache {
    entries: RwLock<LruCache<String, CachedPage>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.page_limit_non_zero())),
            ttl: config.ttl(),
        }
    }

    /// Fetch a page if present and still inside its freshness window.
    ///
    /// Expired entries are dropped on the spot and count as misses.
    pub fn get(&self, path: &str) -> Option<CachedPage> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(path) {
            Some(page) if page.is_fresh(self.ttl) => {
                counter!(METRIC_HIT).increment(1);
                Some(page.clone())
            }
            Some(_) => {
                entries.pop(path);
                counter!(METRIC_MISS).increment(1);
                None
            }
            None => {
                counter!(METRIC_MISS).increment(1);
                None
            }
        }
    }

    /// Store a freshly rendered page under its request path.
    pub fn store(&self, path: &str, page: CachedPage) {
        let mut entries = rw_write(&self.entries, SOURCE, "store");
        if let Some((evicted_path, _)) = entries.push(path.to_string(), page)
            && evicted_path != path
        {
            counter!(METRIC_EVICT).increment(1);
        }
        gauge!(METRIC_ENTRIES).set(entries.len() as f64);
    }

    /// Drop a single path. Returns whether an entry was actually removed;
    /// dropping an uncached path is a no-op.
    pub fn invalidate(&self, path: &str) -> bool {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate");
        let removed = entries.pop(path).is_some();
        gauge!(METRIC_ENTRIES).set(entries.len() as f64);
        removed
    }

    /// Drop every cached page.
    pub fn invalidate_all(&self) {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_all");
        entries.clear();
        gauge!(METRIC_ENTRIES).set(0.0);
    }

    /// Drop entries past the freshness window. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "purge_expired");
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, page)| !page.is_fresh(self.ttl))
            .map(|(path, _)| path.clone())
            .collect();
        for path in &expired {
            entries.pop(path);
        }
        gauge!(METRIC_ENTRIES).set(entries.len() as f64);
        expired.len()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StaleMarker for PageCache {
    async fn mark_stale(&self, path: &str) -> Result<(), MarkStaleError> {
        self.invalidate(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_ttl(ttl_seconds: u64) -> PageCache {
        PageCache::new(&CacheConfig {
            ttl_seconds,
            ..Default::default()
        })
    }

    fn page(body: &str) -> CachedPage {
        CachedPage::new(Bytes::from(body.to_string()), "text/html; charset=utf-8")
    }

    #[test]
    fn store_and_get() {
        let cache = cache_with_ttl(300);
        cache.store("/events", page("<ul></ul>"));

        let hit = cache.get("/events").expect("cached page");
        assert_eq!(hit.body, Bytes::from("<ul></ul>"));
        assert_eq!(hit.content_type, "text/html; charset=utf-8");
    }

    #[test]
    fn expired_entries_read_as_misses() {
        let cache = cache_with_ttl(0);
        cache.store("/events", page("old"));

        assert!(cache.get("/events").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_is_idempotent() {
        let cache = cache_with_ttl(300);
        cache.store("/events/5", page("detail"));

        assert!(cache.invalidate("/events/5"));
        assert!(!cache.invalidate("/events/5"));
        assert!(!cache.invalidate("/never-cached"));
    }

    #[test]
    fn lru_eviction_respects_limit() {
        let cache = PageCache::new(&CacheConfig {
            page_limit: 2,
            ..Default::default()
        });

        cache.store("/a", page("a"));
        cache.store("/b", page("b"));
        cache.store("/c", page("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("/a").is_none());
        assert!(cache.get("/c").is_some());
    }

    #[test]
    fn purge_expired_removes_only_stale_entries() {
        let cache = cache_with_ttl(0);
        cache.store("/a", page("a"));
        cache.store("/b", page("b"));

        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());

        let fresh = cache_with_ttl(300);
        fresh.store("/a", page("a"));
        assert_eq!(fresh.purge_expired(), 0);
        assert_eq!(fresh.len(), 1);
    }

    #[tokio::test]
    async fn mark_stale_trait_is_infallible_in_process() {
        let cache = cache_with_ttl(300);
        cache.store("/events", page("listing"));

        let marker: &dyn StaleMarker = &cache;
        marker.mark_stale("/events").await.expect("in-process mark");
        marker.mark_stale("/events").await.expect("second mark");

        assert!(cache.is_empty());
    }
}
