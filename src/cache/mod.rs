//! Whole-page response cache.
//!
//! Rendered pages are stored per request identity (path plus query string) and
//! served for a fixed window after they were written:
//!
//! ```toml
//! [cache]
//! enabled = true
//! page_ttl_seconds = 20
//! max_entries = 256
//! ```
//!
//! Writes to posts do not touch the cache, so a listing can show content up to
//! `page_ttl_seconds` old. `PageCache::clear` drops everything at once.

mod clock;
mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PageCacheConfig;
pub use keys::PageKey;
pub use middleware::page_cache_layer;
pub use store::{
    CachedResponse, METRIC_PAGE_CACHE_EVICT, METRIC_PAGE_CACHE_EXPIRED, METRIC_PAGE_CACHE_HIT,
    METRIC_PAGE_CACHE_MISS, PageCache,
};
