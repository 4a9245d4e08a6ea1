//! Page cache configuration, built from the `[cache]` settings section.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_PAGE_TTL_SECONDS: u64 = 20;
const DEFAULT_MAX_ENTRIES: usize = 256;
const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct PageCacheConfig {
    /// Serve and store cached pages at all.
    pub enabled: bool,
    /// How long a stored page is served before it is rendered again.
    pub ttl: Duration,
    /// Maximum number of distinct pages kept; least recently used go first.
    pub max_entries: usize,
    /// Responses with larger bodies are passed through uncached.
    pub body_limit_bytes: usize,
}

impl Default for PageCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(DEFAULT_PAGE_TTL_SECONDS),
            max_entries: DEFAULT_MAX_ENTRIES,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for PageCacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl: Duration::from_secs(u64::from(settings.page_ttl_seconds.get())),
            max_entries: settings.max_entries.get() as usize,
            body_limit_bytes: settings.body_limit_bytes.get() as usize,
        }
    }
}

impl PageCacheConfig {
    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = PageCacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.ttl, Duration::from_secs(20));
        assert_eq!(config.max_entries, 256);
        assert_eq!(config.body_limit_bytes, 1024 * 1024);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = PageCacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert_eq!(config.max_entries_non_zero().get(), 1);
    }
}
