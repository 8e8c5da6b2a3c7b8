//! Handlers that change posts, comments and follows.

use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

use crate::application::{
    error::HttpError,
    follows::{FollowError, FollowOutcome},
    posts::{
        CommentOutcome, EditAccess, ImageUpload, PostError, PostFormState, PostService,
        ValidatedPost, ValidationOutcome,
    },
};
use crate::domain::entities::{PostEntry, UserRecord};
use crate::domain::posts::EMPTY_IMAGE_MESSAGE;
use crate::infra::uploads::MediaStorageError;
use crate::presentation::views::{
    LayoutContext, PostFormTemplate, PostFormView, render_not_found_response,
    render_template_response,
};

use super::{
    HttpState, RequireUser, forms::PostForm, found, post_path, profile_path,
    public::parse_post_id,
};


#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentFields {
    text: String,
}

pub(super) async fn create_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
) -> Response {
    render_post_form(&state, &user, &PostFormState::default(), None).await
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    PostForm(submission): PostForm,
) -> Response {
    let validated = match state.posts.validate(submission).await {
        Ok(ValidationOutcome::Valid(validated)) => validated,
        Ok(ValidationOutcome::Invalid(form)) => {
            return render_post_form(&state, &user, &form, None).await;
        }
        Err(err) => return HttpError::from(err).into_response(),
    };

    let ValidatedPost { draft, image } = validated;
    let image = match store_image(&state, image).await {
        Ok(image) => image,
        Err(ImageStoreFailure::Empty) => {
            let form = form_with_image_error(&draft.text, draft.group_id);
            return render_post_form(&state, &user, &form, None).await;
        }
        Err(ImageStoreFailure::Response(response)) => return response,
    };

    match state.posts.create(user.id, draft, image).await {
        Ok(_) => found(&profile_path(&user.username)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Response {
    let entry = match owned_post(&state, &user, &id).await {
        Ok(entry) => entry,
        Err(response) => return response,
    };
    let form = PostService::edit_form(&entry);
    render_post_form(&state, &user, &form, Some(&entry)).await
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    PostForm(submission): PostForm,
) -> Response {
    let entry = match owned_post(&state, &user, &id).await {
        Ok(entry) => entry,
        Err(response) => return response,
    };

    let validated = match state.posts.validate(submission).await {
        Ok(ValidationOutcome::Valid(validated)) => validated,
        Ok(ValidationOutcome::Invalid(form)) => {
            return render_post_form(&state, &user, &form, Some(&entry)).await;
        }
        Err(err) => return HttpError::from(err).into_response(),
    };

    let ValidatedPost { draft, image } = validated;
    let image = match store_image(&state, image).await {
        Ok(image) => image,
        Err(ImageStoreFailure::Empty) => {
            let form = form_with_image_error(&draft.text, draft.group_id);
            return render_post_form(&state, &user, &form, Some(&entry)).await;
        }
        Err(ImageStoreFailure::Response(response)) => return response,
    };

    match state.posts.update(&entry, draft, image).await {
        Ok(post) => found(&post_path(post.id)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    Form(fields): Form<CommentFields>,
) -> Response {
    let Some(post_id) = parse_post_id(&id) else {
        return render_not_found_response(Some(&user));
    };

    match state.posts.add_comment(post_id, user.id, &fields.text).await {
        Ok(CommentOutcome::Added(comment)) => {
            tracing::info!(
                target = "yatube::http::posts",
                post_id,
                comment_id = comment.id,
                "comment added"
            );
            found(&post_path(post_id))
        }
        Ok(CommentOutcome::Rejected(reason)) => {
            tracing::debug!(
                target = "yatube::http::posts",
                post_id,
                reason = %reason,
                "comment rejected"
            );
            found(&post_path(post_id))
        }
        Err(PostError::NotFound) => render_not_found_response(Some(&user)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(&user, &username).await {
        Ok(FollowOutcome::Created | FollowOutcome::AlreadyFollowing | FollowOutcome::SelfFollow) => {
            found(&profile_path(&username))
        }
        Err(FollowError::UnknownAuthor) => render_not_found_response(Some(&user)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(&user, &username).await {
        Ok(_) => found("/"),
        Err(FollowError::UnknownAuthor) => render_not_found_response(Some(&user)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// Load a post for editing. Missing posts render 404; other authors are sent to the detail page.
async fn owned_post(state: &HttpState, user: &UserRecord, raw_id: &str) -> Result<PostEntry, Response> {
    let Some(post_id) = parse_post_id(raw_id) else {
        return Err(render_not_found_response(Some(user)));
    };

    match state.posts.authorize_edit(post_id, user.id).await {
        Ok(EditAccess::Owner(entry)) => Ok(entry),
        Ok(EditAccess::NotOwner(entry)) => {
            warn!(
                target = "yatube::http::posts",
                post_id,
                user_id = user.id,
                author_id = entry.post.author_id,
                "edit attempt by non-author"
            );
            Err(found(&post_path(post_id)))
        }
        Err(PostError::NotFound) => Err(render_not_found_response(Some(user))),
        Err(err) => Err(HttpError::from(err).into_response()),
    }
}

enum ImageStoreFailure {
    Empty,
    Response(Response),
}

async fn store_image(
    state: &HttpState,
    image: Option<ImageUpload>,
) -> Result<Option<String>, ImageStoreFailure> {
    let Some(image) = image else {
        return Ok(None);
    };

    match state
        .media
        .store_post_image(&image.filename, image.data)
        .await
    {
        Ok(stored) => Ok(Some(stored.stored_path)),
        Err(MediaStorageError::EmptyPayload) => Err(ImageStoreFailure::Empty),
        Err(err) => Err(ImageStoreFailure::Response(
            HttpError::from_error(
                "infra::http::posts::store_image",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not store uploaded image",
                &err,
            )
            .into_response(),
        )),
    }
}

fn form_with_image_error(text: &str, group_id: Option<i64>) -> PostFormState {
    let mut form = PostFormState {
        text: text.to_string(),
        group: group_id.map(|id| id.to_string()),
        ..PostFormState::default()
    };
    form.errors.push("image", EMPTY_IMAGE_MESSAGE);
    form
}

async fn render_post_form(
    state: &HttpState,
    user: &UserRecord,
    form: &PostFormState,
    editing: Option<&PostEntry>,
) -> Response {
    let groups = match state.posts.group_choices().await {
        Ok(groups) => groups,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let editing = editing.map(|entry| (entry.post.id, entry.post.image.as_deref()));
    let title = if editing.is_some() { "Edit post" } else { "New post" };
    let content = PostFormView::new(form, &groups, editing);
    let view = LayoutContext::new(Some(user), title, content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}
