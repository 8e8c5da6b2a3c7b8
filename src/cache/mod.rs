//! Page cache for the main feed.
//!
//! Rendered responses are stored whole under a key built from a fixed prefix,
//! the request path and query, and a digest of the request cookies. Entries
//! live for a fixed timeout; writes elsewhere in the application never touch
//! them, so the feed may serve stale bytes until an entry expires or the
//! cache is cleared.
//!
//! ```toml
//! [cache]
//! enabled = true
//! key_prefix = "index_page"
//! timeout_seconds = 20
//! max_entries = 256
//! ```

mod config;
mod keys;
mod middleware;
mod store;

pub use config::PageCacheConfig;
pub use keys::page_key;
pub use middleware::page_cache_layer;
pub use store::{CacheStoreError, CachedPage, PageCache, buffer_response, should_store_response};
