mod admin;
mod auth;
mod forms;
mod middleware;
mod posts;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use auth::{CurrentUser, RequireUser, login_redirect_target, safe_next};
pub use middleware::RequestContext;
pub use public::build_router;

use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};

use crate::application::{
    accounts::AccountService, error::ErrorReport, feed::FeedService, follows::FollowService,
    posts::PostService, repos::HealthRepo, repos::RepoError,
};
use crate::cache::PageCache;
use crate::infra::uploads::MediaStorage;

/// Shared state of the public listener.
#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub health: Arc<dyn HealthRepo>,
    pub media: Arc<MediaStorage>,
    pub page_cache: Option<Arc<PageCache>>,
    pub session_cookie: SessionCookie,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Plain `302 Found` to a local path.
pub(crate) fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::FOUND, [(LOCATION, HeaderValue::from_static("/"))]).into_response(),
    }
}

/// Profile URL for `username`, percent-encoded as a path segment.
pub(crate) fn profile_path(username: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{encoded}/")
}

pub(crate) fn post_path(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}
