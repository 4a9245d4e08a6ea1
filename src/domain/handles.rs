//! Username rules shared by the admin CLI and the public routes.

use thiserror::Error;

pub const MAX_USERNAME_LEN: usize = 150;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    #[error("username must not be empty")]
    Empty,
    #[error("username must be at most {max} characters long")]
    TooLong { max: usize },
    #[error("username contains unsupported character `{ch}`")]
    InvalidCharacter { ch: char },
}

/// Validate a username: letters, digits and `@ . + - _` only.
pub fn validate_username(candidate: &str) -> Result<(), HandleError> {
    if candidate.is_empty() {
        return Err(HandleError::Empty);
    }
    if candidate.chars().count() > MAX_USERNAME_LEN {
        return Err(HandleError::TooLong {
            max: MAX_USERNAME_LEN,
        });
    }
    match candidate
        .chars()
        .find(|ch| !(ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_')))
    {
        Some(ch) => Err(HandleError::InvalidCharacter { ch }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_handles() {
        for handle in ["auth", "follower1", "jane.doe", "a+b@example", "under_score"] {
            assert!(validate_username(handle).is_ok(), "{handle} should be valid");
        }
    }

    #[test]
    fn rejects_whitespace_and_slashes() {
        assert_eq!(
            validate_username("two words"),
            Err(HandleError::InvalidCharacter { ch: ' ' })
        );
        assert_eq!(
            validate_username("a/b"),
            Err(HandleError::InvalidCharacter { ch: '/' })
        );
    }

    #[test]
    fn rejects_overlong_handles() {
        let handle = "x".repeat(MAX_USERNAME_LEN + 1);
        assert_eq!(
            validate_username(&handle),
            Err(HandleError::TooLong {
                max: MAX_USERNAME_LEN
            })
        );
    }
}
