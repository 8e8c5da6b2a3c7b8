//! Session cookie handling, the viewer extractors and the account pages.

use axum::{
    Form,
    extract::{FromRequestParts, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::application::accounts::{SignupForm, SignupOutcome};
use crate::application::error::HttpError;
use crate::application::forms::FieldErrors;
use crate::domain::entities::UserRecord;
use crate::presentation::views::{
    LayoutContext, LoggedOutTemplate, LoginTemplate, LoginView, SignupTemplate, SignupView,
    render_template_response,
};

use super::{HttpState, found, middleware::RequestContext};

pub const LOGIN_PATH: &str = "/auth/login/";

/// The signed-in user, if any. Resolved once per request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<UserRecord>);

/// A signed-in user. Anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct RequireUser(pub UserRecord);

#[derive(Clone)]
struct ResolvedViewer(Option<UserRecord>);

impl FromRequestParts<HttpState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(ResolvedViewer(user)) = parts.extensions.get::<ResolvedViewer>() {
            return Ok(Self(user.clone()));
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let user = match jar.get(&state.session_cookie.name) {
            Some(cookie) => state
                .accounts
                .authenticate(cookie.value())
                .await
                .map_err(|err| HttpError::from(err).into_response())?,
            None => None,
        };

        if let (Some(user), Some(ctx)) = (&user, parts.extensions.get::<RequestContext>()) {
            ctx.record_viewer(user.id);
        }
        parts.extensions.insert(ResolvedViewer(user.clone()));
        Ok(Self(user))
    }
}

impl FromRequestParts<HttpState> for RequireUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        match user {
            Some(user) => Ok(Self(user)),
            None => {
                let full_path = parts
                    .uri
                    .path_and_query()
                    .map(|value| value.as_str())
                    .unwrap_or_else(|| parts.uri.path());
                Err(found(&login_redirect_target(full_path)))
            }
        }
    }
}

/// Login URL carrying `full_path` as `next`. Slashes stay unescaped.
pub fn login_redirect_target(full_path: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(full_path.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={}", encoded.replace("%2F", "/"))
}

/// Accept only local absolute paths as redirect targets.
pub fn safe_next(candidate: Option<&str>) -> &str {
    match candidate.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

async fn sign_in(state: &HttpState, jar: CookieJar, user_id: i64) -> Result<CookieJar, HttpError> {
    let session = state.accounts.start_session(user_id).await?;
    let cookie = Cookie::build((state.session_cookie.name.clone(), session.token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.session_cookie.secure)
        .max_age(state.accounts.session_ttl());
    Ok(jar.add(cookie))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginFields {
    username: String,
    password: String,
    next: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SignupFields {
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    password1: String,
    password2: String,
}

pub(super) async fn login_form(
    CurrentUser(viewer): CurrentUser,
    Query(query): Query<NextQuery>,
) -> Response {
    let content = LoginView {
        username: String::new(),
        next: safe_next(query.next.as_deref()).to_string(),
        invalid: false,
    };
    let view = LayoutContext::new(viewer.as_ref(), "Log in", content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(fields): Form<LoginFields>,
) -> Response {
    match state.accounts.login(&fields.username, &fields.password).await {
        Ok(Some(user)) => match sign_in(&state, jar, user.id).await {
            Ok(jar) => {
                tracing::info!(
                    target = "yatube::http::auth",
                    user_id = user.id,
                    "user signed in"
                );
                (jar, found(safe_next(Some(&fields.next)))).into_response()
            }
            Err(err) => err.into_response(),
        },
        Ok(None) => {
            let content = LoginView {
                username: fields.username,
                next: safe_next(Some(&fields.next)).to_string(),
                invalid: true,
            };
            let view = LayoutContext::new(None, "Log in", content);
            render_template_response(LoginTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn signup_form(CurrentUser(viewer): CurrentUser) -> Response {
    let view = LayoutContext::new(viewer.as_ref(), "Sign up", SignupView::default());
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

pub(super) async fn signup_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(fields): Form<SignupFields>,
) -> Response {
    let form = SignupForm {
        username: fields.username.clone(),
        first_name: fields.first_name.clone(),
        last_name: fields.last_name.clone(),
        email: fields.email.clone(),
        password1: fields.password1.clone(),
        password2: fields.password2.clone(),
    };

    match state.accounts.create_user(form).await {
        Ok(SignupOutcome::Created(user)) => match sign_in(&state, jar, user.id).await {
            Ok(jar) => (jar, found("/")).into_response(),
            Err(err) => err.into_response(),
        },
        Ok(SignupOutcome::Invalid(errors)) => render_signup(&fields, &errors),
        Err(err) => HttpError::from(err).into_response(),
    }
}

fn render_signup(fields: &SignupFields, errors: &FieldErrors) -> Response {
    let content = SignupView::new(
        &fields.username,
        &fields.first_name,
        &fields.last_name,
        &fields.email,
        errors,
    );
    let view = LayoutContext::new(None, "Sign up", content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(&state.session_cookie.name)
        && let Err(err) = state.accounts.end_session(cookie.value()).await
    {
        return HttpError::from(err).into_response();
    }

    let jar = jar.remove(Cookie::build((state.session_cookie.name.clone(), "")).path("/"));
    let view = LayoutContext::new(None, "Logged out", ());
    (
        jar,
        render_template_response(LoggedOutTemplate { view }, StatusCode::OK),
    )
        .into_response()
}
