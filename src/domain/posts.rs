//! Rules for post and comment content.

use super::error::DomainError;

/// Image extensions accepted for post attachments.
const IMAGE_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "webp"];

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const EMPTY_IMAGE_MESSAGE: &str = "The submitted file is empty.";
pub const INVALID_GROUP_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Trim surrounding whitespace and reject blank post bodies.
pub fn normalize_post_text(raw: &str) -> Result<String, DomainError> {
    normalize_required("text", raw)
}

/// Trim surrounding whitespace and reject blank comments.
pub fn normalize_comment_text(raw: &str) -> Result<String, DomainError> {
    normalize_required("text", raw)
}

/// Parse the optional group choice submitted with a post form.
///
/// Blank values mean "no group". Anything else must be a positive integer id;
/// whether the id exists is checked by the caller.
pub fn parse_group_choice(raw: Option<&str>) -> Result<Option<i64>, DomainError> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    match value.parse::<i64>() {
        Ok(id) if id > 0 => Ok(Some(id)),
        _ => Err(DomainError::validation("group", INVALID_GROUP_MESSAGE)),
    }
}

/// Accept an uploaded file as a post image.
///
/// The name and declared type must look like an image and the payload must
/// carry a readable image header.
pub fn check_image(
    filename: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Result<(), DomainError> {
    if data.is_empty() {
        return Err(DomainError::validation("image", EMPTY_IMAGE_MESSAGE));
    }

    let declared = content_type
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value != "application/octet-stream");

    let guessed = mime_guess::from_path(filename).first();
    let extension_ok = std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    let type_ok = match declared {
        Some(value) => value.starts_with("image/"),
        None => guessed.is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE),
    };

    let decodes = matches!(
        imagesize::blob_size(data),
        Ok(size) if size.width > 0 && size.height > 0
    );

    if type_ok && extension_ok && decodes {
        Ok(())
    } else {
        Err(DomainError::validation("image", INVALID_IMAGE_MESSAGE))
    }
}

fn normalize_required(field: &'static str, raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, REQUIRED_MESSAGE));
    }
    Ok(trimmed.to_string())
}
