use axum::{
    Form,
    extract::{FromRequest, Request},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use axum_extra::extract::multipart::MultipartError;
use serde::Deserialize;

use crate::application::error::HttpError;
use crate::application::posts::{ImageUpload, PostSubmission};

use super::HttpState;

const SOURCE: &str = "infra::http::forms::PostForm";

/// Post form fields from either a urlencoded or a multipart body.
#[derive(Debug, Clone)]
pub struct PostForm(pub PostSubmission);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UrlencodedPost {
    text: String,
    group: Option<String>,
}

impl FromRequest<HttpState> for PostForm {
    type Rejection = Response;

    async fn from_request(request: Request, state: &HttpState) -> Result<Self, Self::Rejection> {
        let is_multipart = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(fields) = Form::<UrlencodedPost>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self(PostSubmission {
                text: fields.text,
                group: fields.group,
                image: None,
            }));
        }

        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(IntoResponse::into_response)?;
        read_multipart(&mut multipart)
            .await
            .map(Self)
            .map_err(|err| multipart_error(err, state.body_limit_bytes))
    }
}

async fn read_multipart(multipart: &mut Multipart) -> Result<PostSubmission, MultipartError> {
    let mut submission = PostSubmission::default();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("text") => submission.text = field.text().await?,
            Some("group") => submission.group = Some(field.text().await?),
            Some("image") => {
                let filename = field
                    .file_name()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string();
                let content_type = field.content_type().map(|value| value.to_string());
                let data = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                submission.image = Some(ImageUpload {
                    filename,
                    content_type,
                    data,
                });
            }
            _ => continue,
        }
    }

    Ok(submission)
}

fn multipart_error(err: MultipartError, limit_bytes: usize) -> Response {
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::warn!(
                target = "yatube::http::forms",
                limit_bytes,
                limit_mib = limit_bytes.div_ceil(1_048_576),
                error = %err,
                "post form exceeded configured body limit"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body is too large",
                &err,
            )
            .into_response()
        }
        status => HttpError::from_error(SOURCE, status, "Form data was invalid", &err).into_response(),
    }
}
