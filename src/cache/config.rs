//! Render cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_PAGE_LIMIT: usize = 256;
const DEFAULT_TTL_SECONDS: u64 = 300;
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Render cache configuration from `balera.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the rendered-page cache.
    pub enabled: bool,
    /// Maximum cached pages before LRU eviction.
    pub page_limit: usize,
    /// Freshness window: entries older than this are regenerated on the next
    /// request even without an explicit stale-mark.
    pub ttl_seconds: u64,
    /// Interval of the background sweep that drops expired entries.
    pub sweep_interval_seconds: u64,
    /// Response bodies larger than this are served but not cached.
    pub max_body_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_limit: DEFAULT_PAGE_LIMIT,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            page_limit: settings.page_limit,
            ttl_seconds: settings.ttl_seconds,
            sweep_interval_seconds: settings.sweep_interval_seconds,
            max_body_bytes: settings.max_body_bytes,
        }
    }
}

impl CacheConfig {
    /// Returns the page limit as NonZeroUsize, clamping to 1 if zero.
    pub fn page_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.page_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.page_limit, 256);
        assert_eq!(config.ttl_seconds, 300);
        assert_eq!(config.sweep_interval_seconds, 60);
        assert_eq!(config.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            page_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.page_limit_non_zero().get(), 1);
    }
}
