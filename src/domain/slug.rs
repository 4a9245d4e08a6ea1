//! Group slugs.
//!
//! A slug is the URL-safe identifier used in `/group/{slug}/`. Explicit slugs
//! are validated as-is (ASCII letters, digits, `-` and `_`); missing slugs are
//! derived from the group title through the `slug` crate.

use slug::slugify;
use thiserror::Error;

pub const MAX_SLUG_LEN: usize = 50;

/// Errors that can occur while deriving or validating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug must be at most {max} characters long")]
    TooLong { max: usize },
    #[error("slug contains unsupported character `{ch}`")]
    InvalidCharacter { ch: char },
}

/// Derive a slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.len() > MAX_SLUG_LEN {
        candidate.truncate(MAX_SLUG_LEN);
        while candidate.ends_with('-') {
            candidate.pop();
        }
    }

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Check that an explicitly supplied slug is usable in a URL path segment.
pub fn validate_slug(candidate: &str) -> Result<(), SlugError> {
    if candidate.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if candidate.chars().count() > MAX_SLUG_LEN {
        return Err(SlugError::TooLong { max: MAX_SLUG_LEN });
    }
    if let Some(ch) = candidate
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_'))
    {
        return Err(SlugError::InvalidCharacter { ch });
    }
    Ok(())
}
