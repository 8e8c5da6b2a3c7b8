//! Operator listener: database health and page cache control.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::application::repos::HealthRepo;
use crate::cache::PageCache;

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct AdminState {
    pub health: Arc<dyn HealthRepo>,
    pub page_cache: Option<Arc<PageCache>>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/_health/db", get(admin_health))
        .route("/cache/invalidate", post(invalidate_cache))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn invalidate_cache(State(state): State<AdminState>) -> Response {
    if let Some(cache) = state.page_cache.as_ref() {
        cache.clear();
    }
    StatusCode::NO_CONTENT.into_response()
}
