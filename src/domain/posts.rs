//! Typed write inputs for posts and comments.
//!
//! Raw form values are converted into [`PostInput`] / [`CommentInput`] before
//! any repository call. Conversion either yields a fully valid input or the
//! complete list of field-level problems, so nothing is persisted from a
//! partially valid form.

use std::fmt;

use time::{format_description::FormatItem, macros::format_description};

pub const HUMAN_DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year], [hour]:[minute]");

pub const TEXT_FIELD: &str = "text";
pub const GROUP_FIELD: &str = "group";
pub const IMAGE_FIELD: &str = "image";

pub const MAX_IMAGE_PATH_LEN: usize = 255;

const REQUIRED_MESSAGE: &str = "This field is required.";
const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
const INVALID_IMAGE_MESSAGE: &str = "Enter a relative image path without `..` segments.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Field-level validation messages collected for a single form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|error| error.field == field)
            .map(|error| error.message.as_str())
            .collect()
    }

    /// Message used when a submitted group id does not match a stored group.
    pub fn unknown_group() -> Self {
        Self::single(GROUP_FIELD, INVALID_CHOICE_MESSAGE)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

/// Validated content for creating or editing a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInput {
    text: String,
    group_id: Option<i64>,
    image: Option<String>,
}

impl PostInput {
    pub fn parse(
        text: &str,
        group: Option<&str>,
        image: Option<&str>,
    ) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let text = text.trim();
        if text.is_empty() {
            errors.push(TEXT_FIELD, REQUIRED_MESSAGE);
        }

        let group_id = match group.map(str::trim).filter(|value| !value.is_empty()) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if id > 0 => Some(id),
                _ => {
                    errors.push(GROUP_FIELD, INVALID_CHOICE_MESSAGE);
                    None
                }
            },
        };

        let image = match image.map(str::trim).filter(|value| !value.is_empty()) {
            None => None,
            Some(path) if is_acceptable_image_path(path) => Some(path.to_string()),
            Some(_) => {
                errors.push(IMAGE_FIELD, INVALID_IMAGE_MESSAGE);
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            text: text.to_string(),
            group_id,
            image,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn group_id(&self) -> Option<i64> {
        self.group_id
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn into_parts(self) -> (String, Option<i64>, Option<String>) {
        (self.text, self.group_id, self.image)
    }
}

/// Validated content for a new comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentInput {
    text: String,
}

impl CommentInput {
    pub fn parse(text: &str) -> Result<Self, FieldErrors> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FieldErrors::single(TEXT_FIELD, REQUIRED_MESSAGE));
        }
        Ok(Self {
            text: text.to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

fn is_acceptable_image_path(path: &str) -> bool {
    path.len() <= MAX_IMAGE_PATH_LEN
        && !path.starts_with('/')
        && !path.contains('\\')
        && path.split('/').all(|segment| !segment.is_empty() && segment != "..")
}
