//! Page cache storage.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use tokio::time::Instant;
use tracing::warn;

use super::config::PageCacheConfig;

/// A fully rendered response and the moment it stops being served.
#[derive(Clone)]
pub struct CachedPage {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
    expires_at: Instant,
}

impl CachedPage {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes, expires_at: Instant) -> Self {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            status,
            headers,
            body,
            expires_at,
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.append(name, value);
        }
        response
    }
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

/// Bounded LRU of rendered pages with a fixed time-to-live.
pub struct PageCache {
    config: PageCacheConfig,
    entries: RwLock<LruCache<String, CachedPage>>,
}

impl PageCache {
    pub fn new(config: PageCacheConfig) -> Self {
        let entries = RwLock::new(LruCache::new(config.max_entries_non_zero()));
        Self { config, entries }
    }

    pub fn config(&self) -> &PageCacheConfig {
        &self.config
    }

    /// Fetch a live entry. Expired entries are dropped and reported as a miss.
    pub fn get(&self, key: &str) -> Option<CachedPage> {
        let now = Instant::now();
        let mut entries = self.write_entries("get");
        let expired = match entries.get(key) {
            Some(page) if !page.is_expired(now) => {
                counter!("yatube_page_cache_hit_total").increment(1);
                return Some(page.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        counter!("yatube_page_cache_miss_total").increment(1);
        None
    }

    /// Store a response for the configured timeout.
    pub fn put(&self, key: String, status: StatusCode, headers: &HeaderMap, body: Bytes) {
        let page = CachedPage::new(status, headers, body, Instant::now() + self.config.timeout);
        let evicted = self.write_entries("put").push(key.clone(), page);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!("yatube_page_cache_evict_total").increment(1);
        }
    }

    /// Drop every stored page.
    pub fn clear(&self) {
        self.write_entries("clear").clear();
        tracing::info!(target = "yatube::cache", "page cache cleared");
    }

    pub fn len(&self) -> usize {
        self.read_entries("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock leaves the map itself intact, so the
    // poison flag is cleared and the cache keeps serving.
    fn read_entries(&self, op: &'static str) -> RwLockReadGuard<'_, LruCache<String, CachedPage>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!(target = "yatube::cache", op, "recovered poisoned page cache lock");
            self.entries.clear_poison();
            poisoned.into_inner()
        })
    }

    fn write_entries(&self, op: &'static str) -> RwLockWriteGuard<'_, LruCache<String, CachedPage>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!(target = "yatube::cache", op, "recovered poisoned page cache lock");
            self.entries.clear_poison();
            poisoned.into_inner()
        })
    }
}

/// Only plain successful GET pages are stored. Responses that set cookies
/// belong to one browser and are never shared.
pub fn should_store_response(method: &Method, response: &Response) -> bool {
    method == Method::GET
        && response.status() == StatusCode::OK
        && !response.headers().contains_key(header::SET_COOKIE)
}

/// Collect a response body so it can be both stored and returned.
pub async fn buffer_response(
    response: Response,
    limit: usize,
) -> Result<(Response, Bytes), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match Limited::new(body, limit).collect().await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let rebuilt = Response::from_parts(parts, Body::from(bytes.clone()));
            Ok((rebuilt, bytes))
        }
        Err(error) => {
            let mut rebuilt = Response::from_parts(parts, Body::empty());
            *rebuilt.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            Err((rebuilt, CacheStoreError::Buffer(error.to_string())))
        }
    }
}
