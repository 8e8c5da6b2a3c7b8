//! Page cache key construction.

use axum::http::{Request, header};
use sha2::{Digest, Sha256};

/// Build the storage key for a request.
///
/// Rendered pages greet the signed-in user, so the request cookies take part
/// in the key; requests without cookies share one entry per URL.
pub fn page_key<B>(prefix: &str, request: &Request<B>) -> String {
    let uri = request.uri();
    let path_and_query = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or_else(|| uri.path());

    let mut hasher = Sha256::new();
    for value in request.headers().get_all(header::COOKIE) {
        hasher.update(value.as_bytes());
        hasher.update(b";");
    }
    let cookies = hex::encode(&hasher.finalize()[..16]);

    format!("{prefix}:{path_and_query}:{cookies}")
}
