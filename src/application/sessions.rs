use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::repos::{CreateSessionParams, RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::{SessionRecord, UserRecord};

const TOKEN_PREFIX: &str = "ys";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("unknown user `{0}`")]
    UnknownUser(String),
    #[error("session not found")]
    NotFound,
    #[error("session lifetime is out of range")]
    LifetimeOutOfRange,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionAuthError {
    #[error("invalid session token")]
    Invalid,
    #[error("expired session")]
    Expired,
    #[error("revoked session")]
    Revoked,
    #[error("session storage unavailable")]
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct SessionIssued {
    pub record: SessionRecord,
    pub user: UserRecord,
    pub token: String,
}

#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
}

impl SessionService {
    pub fn new(users: Arc<dyn UsersRepo>, sessions: Arc<dyn SessionsRepo>) -> Self {
        Self { users, sessions }
    }

    /// Mint a session token for `username`. The secret is only returned here.
    pub async fn issue(
        &self,
        username: &str,
        ttl: Option<Duration>,
    ) -> Result<SessionIssued, SessionError> {
        let expires_at = match ttl {
            Some(ttl) => Some(
                OffsetDateTime::now_utc()
                    .checked_add(ttl)
                    .ok_or(SessionError::LifetimeOutOfRange)?,
            ),
            None => None,
        };

        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| SessionError::UnknownUser(username.to_string()))?;

        let prefix = Self::generate_prefix();
        let secret = Self::generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");

        let record = self
            .sessions
            .create_session(CreateSessionParams {
                user_id: user.id,
                prefix,
                hashed_secret: Self::hash_secret(&secret),
                expires_at,
            })
            .await?;

        Ok(SessionIssued {
            record,
            user,
            token,
        })
    }

    pub async fn revoke(&self, prefix: &str) -> Result<SessionRecord, SessionError> {
        self.sessions
            .revoke_session(prefix, OffsetDateTime::now_utc())
            .await
            .map_err(|err| match err {
                RepoError::NotFound => SessionError::NotFound,
                other => SessionError::Repo(other),
            })
    }

    /// Resolve a presented token to the user it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<UserRecord, SessionAuthError> {
        let parsed = Self::parse_token(token).ok_or(SessionAuthError::Invalid)?;
        let record = self
            .sessions
            .find_by_prefix(&parsed.prefix)
            .await
            .map_err(|_| SessionAuthError::Unavailable)?
            .ok_or(SessionAuthError::Invalid)?;

        let now = OffsetDateTime::now_utc();
        if let Some(revoked_at) = record.revoked_at
            && revoked_at <= now
        {
            return Err(SessionAuthError::Revoked);
        }
        if let Some(expires_at) = record.expires_at
            && expires_at <= now
        {
            return Err(SessionAuthError::Expired);
        }

        let hashed_input = Self::hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(SessionAuthError::Invalid);
        }

        self.users
            .find_by_id(record.user_id)
            .await
            .map_err(|_| SessionAuthError::Unavailable)?
            .ok_or(SessionAuthError::Invalid)
    }

    fn hash_secret(secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }

    fn generate_prefix() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    fn generate_secret() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    fn parse_token(token: &str) -> Option<ParsedToken> {
        let mut parts = token.trim().splitn(3, '_');
        if parts.next()? != TOKEN_PREFIX {
            return None;
        }
        let prefix = parts.next()?;
        let secret = parts.next()?;
        if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
            return None;
        }
        Some(ParsedToken {
            prefix: prefix.to_string(),
            secret: secret.to_string(),
        })
    }
}

#[derive(Debug)]
struct ParsedToken {
    prefix: String,
    secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_token_splits_prefix_and_secret() {
        let secret = "a".repeat(MIN_SECRET_LEN);
        let parsed = SessionService::parse_token(&format!("ys_abc123_{secret}"))
            .expect("token should parse");
        assert_eq!(parsed.prefix, "abc123");
        assert_eq!(parsed.secret, secret);
    }

    #[test]
    fn parse_token_rejects_foreign_or_short_tokens() {
        let secret = "a".repeat(MIN_SECRET_LEN);
        assert!(SessionService::parse_token(&format!("sk_abc_{secret}")).is_none());
        assert!(SessionService::parse_token("ys_abc_short").is_none());
        assert!(SessionService::parse_token(&format!("ys__{secret}")).is_none());
        assert!(SessionService::parse_token("ys_abc").is_none());
    }

    #[test]
    fn generated_parts_round_trip_through_the_token_format() {
        let prefix = SessionService::generate_prefix();
        let secret = SessionService::generate_secret();
        let parsed = SessionService::parse_token(&format!("{TOKEN_PREFIX}_{prefix}_{secret}"))
            .expect("generated token should parse");
        assert_eq!(parsed.prefix, prefix);
        assert_eq!(
            SessionService::hash_secret(&parsed.secret),
            SessionService::hash_secret(&secret)
        );
    }
}
