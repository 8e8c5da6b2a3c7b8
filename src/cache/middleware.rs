//! Page cache middleware.
//!
//! Serves stored responses for GET requests and stores fresh successful
//! renders. Applied only to the routes whose pages are cached.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::keys::page_key;
use super::store::{PageCache, buffer_response, should_store_response};

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<Arc<PageCache>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config().enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = page_key(&cache.config().key_prefix, &request);
    if let Some(page) = cache.get(&key) {
        debug!(cache = "page", outcome = "hit", "serving cached page");
        return page.into_response();
    }

    debug!(cache = "page", outcome = "miss", "rendering page");
    let method = request.method().clone();
    let response = next.run(request).await;
    if !should_store_response(&method, &response) {
        return response;
    }

    match buffer_response(response, cache.config().body_limit_bytes).await {
        Ok((response, body)) => {
            cache.put(key, response.status(), response.headers(), body);
            response
        }
        Err((response, error)) => {
            warn!(
                target = "yatube::cache::middleware",
                error = %error,
                "page was not cached"
            );
            response
        }
    }
}
