//! Rendered-page storage with fixed time-to-live.
//!
//! Entries are never invalidated by writes elsewhere in the application: a
//! page stored at `t` is served until `t + ttl`, or until `clear()` is called.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::clock::Clock;
use super::config::PageCacheConfig;
use super::keys::PageKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const METRIC_PAGE_CACHE_HIT: &str = "yatube_page_cache_hit_total";
pub const METRIC_PAGE_CACHE_MISS: &str = "yatube_page_cache_miss_total";
pub const METRIC_PAGE_CACHE_EXPIRED: &str = "yatube_page_cache_expired_total";
pub const METRIC_PAGE_CACHE_EVICT: &str = "yatube_page_cache_evict_total";

/// Cached HTTP response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug)]
struct Entry {
    stored_at: Instant,
    response: CachedResponse,
}

/// Process-wide page cache shared by every request through the router.
pub struct PageCache {
    config: PageCacheConfig,
    clock: Arc<dyn Clock>,
    entries: RwLock<LruCache<PageKey, Entry>>,
}

impl PageCache {
    pub fn new(config: PageCacheConfig, clock: Arc<dyn Clock>) -> Self {
        let entries = RwLock::new(LruCache::new(config.max_entries_non_zero()));
        Self {
            config,
            clock,
            entries,
        }
    }

    pub fn config(&self) -> &PageCacheConfig {
        &self.config
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Look up a live entry. Expired entries are dropped and reported as a miss.
    pub fn get(&self, key: &PageKey) -> Option<CachedResponse> {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");

        let lookup = entries.get(key).map(|entry| {
            (now.saturating_duration_since(entry.stored_at) < self.config.ttl)
                .then(|| entry.response.clone())
        });

        let fresh = match lookup {
            Some(Some(response)) => Some(response),
            Some(None) => {
                entries.pop(key);
                counter!(METRIC_PAGE_CACHE_EXPIRED).increment(1);
                debug!(cache = "page", outcome = "expired", key = %key, "dropping expired page");
                None
            }
            None => None,
        };
        drop(entries);

        match fresh {
            Some(response) => {
                counter!(METRIC_PAGE_CACHE_HIT).increment(1);
                Some(response)
            }
            None => {
                counter!(METRIC_PAGE_CACHE_MISS).increment(1);
                None
            }
        }
    }

    /// Store `response` under `key`, replacing any previous entry.
    pub fn put(&self, key: PageKey, response: CachedResponse) {
        let entry = Entry {
            stored_at: self.clock.now(),
            response,
        };
        let displaced = rw_write(&self.entries, SOURCE, "put").push(key.clone(), entry);
        if let Some((evicted, _)) = displaced
            && evicted != key
        {
            counter!(METRIC_PAGE_CACHE_EVICT).increment(1);
            debug!(cache = "page", evicted = %evicted, "evicted least recently used page");
        }
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    /// Number of stored entries, including ones that have expired but not yet been read.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
