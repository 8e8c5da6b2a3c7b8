use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

/// Per-request bookkeeping shared between the logging layers and handlers.
///
/// The signed-in viewer is only known once a handler resolves the session
/// cookie, so it is recorded through a shared slot rather than a plain field.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
    viewer: Arc<OnceLock<i64>>,
}

impl RequestContext {
    fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            viewer: Arc::new(OnceLock::new()),
        }
    }

    /// Remember which user the request was served for. First write wins.
    pub fn record_viewer(&self, user_id: i64) {
        let _ = self.viewer.set(user_id);
    }

    pub fn viewer_id(&self) -> Option<i64> {
        self.viewer.get().copied()
    }
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::new();
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();
    let ctx = request.extensions().get::<RequestContext>().cloned();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    let request_id = ctx
        .as_ref()
        .map(|ctx| ctx.request_id.as_str())
        .unwrap_or_default();
    // Empty for anonymous viewers and for pages served from the cache.
    let viewer_id = ctx
        .as_ref()
        .and_then(RequestContext::viewer_id)
        .map(|id| id.to_string())
        .unwrap_or_default();

    if !(status.is_client_error() || status.is_server_error()) {
        debug!(
            target = "yatube::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            elapsed_ms = elapsed_ms,
            request_id = request_id,
            viewer_id = %viewer_id,
            "request served",
        );
        return response;
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    let (source, messages) = match report {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());

    if status.is_server_error() {
        error!(
            target = "yatube::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = %detail,
            chain = ?messages,
            request_id = request_id,
            viewer_id = %viewer_id,
            "request failed",
        );
    } else {
        warn!(
            target = "yatube::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = %detail,
            chain = ?messages,
            request_id = request_id,
            viewer_id = %viewer_id,
            "client request error",
        );
    }

    response
}
