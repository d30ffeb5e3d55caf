//! Balera render cache.
//!
//! Holds rendered page bodies keyed by request path. Two things expire an
//! entry: an explicit stale-mark from the revalidation endpoint, and the
//! per-entry freshness window (the backstop when an invalidation was lost).
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `balera.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! page_limit = 256
//! ttl_seconds = 300
//! # ... see config.rs for all options
//! ```

mod config;
mod lock;
mod middleware;
mod store;

use async_trait::async_trait;
use thiserror::Error;

pub use config::CacheConfig;
pub use middleware::{CacheState, page_cache_layer};
pub use store::{CachedPage, PageCache};

/// Failure to mark a path stale in the render tier.
#[derive(Debug, Error)]
#[error("render tier unavailable for `{path}`: {reason}")]
pub struct MarkStaleError {
    pub path: String,
    pub reason: String,
}

/// The render tier as consumed by the invalidation endpoint.
///
/// `mark_stale` must be idempotent and order-independent: marking a path
/// twice, or marking paths out of mutation order, leaves the tier in the
/// same state. Marking a path that was never cached is a no-op, not an error.
#[async_trait]
pub trait StaleMarker: Send + Sync {
    async fn mark_stale(&self, path: &str) -> Result<(), MarkStaleError>;
}
