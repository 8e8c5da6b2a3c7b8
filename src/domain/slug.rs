//! Group slug helpers.
//!
//! Slugs appear in `/group/{slug}/` URLs, so they are limited to ASCII
//! letters, digits, hyphens and underscores.

use slug::slugify;
use thiserror::Error;

pub const SLUG_MAX_LEN: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` may only contain letters, numbers, underscores or hyphens")]
    InvalidCharacters { slug: String },
    #[error("slug is longer than {SLUG_MAX_LEN} characters")]
    TooLong,
}

/// Derive a slug from a group title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    if candidate.len() > SLUG_MAX_LEN {
        candidate.truncate(SLUG_MAX_LEN);
        candidate = candidate.trim_end_matches('-').to_string();
    }

    Ok(candidate)
}

/// Validate a slug supplied verbatim by an operator.
pub fn validate_slug(input: &str) -> Result<String, SlugError> {
    let slug = input.trim();
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if slug.len() > SLUG_MAX_LEN {
        return Err(SlugError::TooLong);
    }
    if !slug
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(SlugError::InvalidCharacters {
            slug: slug.to_string(),
        });
    }
    Ok(slug.to_string())
}
