//! Page cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_KEY_PREFIX: &str = "index_page";
const DEFAULT_TIMEOUT_SECONDS: u64 = 20;
const DEFAULT_MAX_ENTRIES: usize = 256;
const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct PageCacheConfig {
    pub enabled: bool,
    /// Prefix every stored key starts with.
    pub key_prefix: String,
    /// How long an entry is served before it is rendered again.
    pub timeout: Duration,
    /// Maximum stored responses; the least recently used is evicted first.
    pub max_entries: usize,
    /// Responses with larger bodies are passed through without being stored.
    pub body_limit_bytes: usize,
}

impl Default for PageCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            max_entries: DEFAULT_MAX_ENTRIES,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for PageCacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            key_prefix: settings.key_prefix.clone(),
            timeout: settings.timeout,
            max_entries: settings.max_entries.get(),
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

impl PageCacheConfig {
    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}
