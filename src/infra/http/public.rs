use std::io::ErrorKind;

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use tracing::error;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        feed::FeedError,
        pagination::PageQuery,
        posts::PostError,
    },
    cache::page_cache_layer,
    domain::entities::UserRecord,
    infra::uploads::MediaStorageError,
    presentation::views::{
        CommentView, FeedView, FollowTemplate, GroupFeedView, GroupListTemplate, IndexTemplate,
        LayoutContext, ListingView, PostCard, PostDetailTemplate, PostDetailView, ProfileTemplate,
        ProfileView, post_title, render_not_found_response, render_template_response,
    },
};

use super::{
    CurrentUser, HttpState, RequireUser, auth, db_health_response,
    middleware::{log_responses, set_request_context},
    posts,
};

pub fn build_router(state: HttpState) -> Router {
    // Only the main feed goes through the page cache.
    let cached_routes = Router::new().route("/", get(index));
    let cached_routes = match state.page_cache.clone() {
        Some(cache) => {
            cached_routes.layer(middleware::from_fn_with_state(cache, page_cache_layer))
        }
        None => cached_routes,
    };

    let routes = Router::new()
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route(
            "/profile/{username}/follow/",
            get(posts::profile_follow).post(posts::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(posts::profile_unfollow).post(posts::profile_unfollow),
        )
        .route("/posts/{id}/", get(post_detail))
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .route("/posts/{id}/comment/", post(posts::add_comment))
        .route("/create/", get(posts::create_form).post(posts::create_submit))
        .route("/follow/", get(follow_index))
        .route(
            "/auth/signup/",
            get(auth::signup_form).post(auth::signup_submit),
        )
        .route("/auth/login/", get(auth::login_form).post(auth::login_submit))
        .route("/auth/logout/", get(auth::logout).post(auth::logout))
        .route("/media/{*path}", get(serve_media))
        .route("/_health/db", get(public_health))
        .fallback(fallback);

    let body_limit = state.body_limit_bytes;
    cached_routes
        .merge(routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(
    State(state): State<HttpState>,
    CurrentUser(viewer): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.index(query.page.as_deref()).await {
        Ok(page) => {
            let content = ListingView {
                feed: FeedView::from(&page),
            };
            let view = LayoutContext::new(viewer.as_ref(), "Latest posts", content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer.as_ref()),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    CurrentUser(viewer): CurrentUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.group_feed(&slug, query.page.as_deref()).await {
        Ok(feed) => {
            let content = GroupFeedView {
                title: feed.group.title.clone(),
                slug: feed.group.slug.clone(),
                description: feed.group.description.clone(),
                feed: FeedView::from(&feed.page),
            };
            let view = LayoutContext::new(viewer.as_ref(), feed.group.title, content);
            render_template_response(GroupListTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer.as_ref()),
    }
}

async fn profile(
    State(state): State<HttpState>,
    CurrentUser(viewer): CurrentUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state
        .feed
        .profile(&username, viewer.as_ref(), query.page.as_deref())
        .await
    {
        Ok(feed) => {
            let full_name = feed.author.display_name();
            let content = ProfileView {
                username: feed.author.username.clone(),
                full_name: full_name.clone(),
                post_count: feed.post_count(),
                can_follow: feed.can_follow,
                following: feed.following,
                feed: FeedView::from(&feed.page),
            };
            let title = format!("Profile of {full_name}");
            let view = LayoutContext::new(viewer.as_ref(), title, content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer.as_ref()),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<String>,
) -> Response {
    let Some(post_id) = parse_post_id(&id) else {
        return render_not_found_response(viewer.as_ref());
    };

    match state.posts.detail(post_id).await {
        Ok(detail) => {
            let can_edit = viewer
                .as_ref()
                .is_some_and(|user| user.id == detail.entry.post.author_id);
            let content = PostDetailView {
                post: PostCard::from(&detail.entry),
                author_post_count: detail.author_post_count,
                comments: detail.comments.iter().map(CommentView::from).collect(),
                can_edit,
                can_comment: viewer.is_some(),
            };
            let title = post_title(&detail.entry.post.text);
            let view = LayoutContext::new(viewer.as_ref(), title, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(PostError::NotFound) => render_not_found_response(viewer.as_ref()),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn follow_index(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.follow_feed(user.id, query.page.as_deref()).await {
        Ok(page) => {
            let content = ListingView {
                feed: FeedView::from(&page),
            };
            let view = LayoutContext::new(Some(&user), "Subscriptions", content);
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, Some(&user)),
    }
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.media.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(MediaStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "File not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(MediaStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "File not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = "yatube::http::media",
                path = %path,
                error = %err,
                "failed to read stored media"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read media file",
                &err,
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    // Stored names carry a random identifier and never change.
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn fallback(CurrentUser(viewer): CurrentUser) -> Response {
    render_not_found_response(viewer.as_ref())
}

pub(super) fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

fn feed_error_to_response(err: FeedError, viewer: Option<&UserRecord>) -> Response {
    let message = match err {
        FeedError::UnknownGroup => "Unknown group",
        FeedError::UnknownAuthor => "Unknown author",
        other => return HttpError::from(other).into_response(),
    };
    let mut response = render_not_found_response(viewer);
    ErrorReport::from_message(
        "infra::http::feed_error_to_response",
        StatusCode::NOT_FOUND,
        message,
    )
    .attach(&mut response);
    response
}
