//! Directed follow edges between users.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error(transparent)]
    Rejected(#[from] DomainError),
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Removed,
    NotFollowing,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn find_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }

    /// Add `follower -> author`. A repeated follow is a no-op.
    #[instrument(skip_all, fields(follower = follower.id, author = author.id))]
    pub async fn follow(
        &self,
        follower: &UserRecord,
        author: &UserRecord,
    ) -> Result<FollowOutcome, FollowError> {
        if follower.id == author.id {
            return Err(DomainError::invalid_operation("users cannot follow themselves").into());
        }

        match self.follows.insert_follow(follower.id, author.id).await {
            Ok(true) => Ok(FollowOutcome::Created),
            Ok(false) | Err(RepoError::Duplicate { .. }) => {
                debug!(target = "yatube::follows", "follow edge already present");
                Ok(FollowOutcome::AlreadyFollowing)
            }
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip_all, fields(follower = follower.id, author = author.id))]
    pub async fn unfollow(
        &self,
        follower: &UserRecord,
        author: &UserRecord,
    ) -> Result<UnfollowOutcome, FollowError> {
        let removed = self.follows.delete_follow(follower.id, author.id).await?;
        Ok(if removed {
            UnfollowOutcome::Removed
        } else {
            UnfollowOutcome::NotFollowing
        })
    }

    pub async fn is_following(
        &self,
        follower: &UserRecord,
        author: &UserRecord,
    ) -> Result<bool, FollowError> {
        if follower.id == author.id {
            return Ok(false);
        }
        Ok(self.follows.follow_exists(follower.id, author.id).await?)
    }

    pub async fn followed_authors(
        &self,
        user: &UserRecord,
    ) -> Result<Vec<UserRecord>, FollowError> {
        Ok(self.follows.list_followed(user.id).await?)
    }
}
