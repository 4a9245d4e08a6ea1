//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::PageWindow;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, SessionRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Group(i64),
    Author(i64),
    /// Posts written by anyone the given user follows.
    FollowedBy(i64),
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub user_id: i64,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError>;

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;
}

/// Read side of posts. Listings are ordered by `created_at DESC, id DESC`.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError>;

    async fn list_posts(
        &self,
        scope: PostScope,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Returns `RepoError::NotFound` when the post does not exist.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments of a post, oldest first.
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Insert the edge unless it already exists. Returns whether a row was written.
    async fn insert_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    /// Returns whether an edge was removed.
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    async fn follow_exists(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    /// Authors followed by `user_id`, ordered by username.
    async fn list_followed(&self, user_id: i64) -> Result<Vec<UserRecord>, RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError>;

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError>;

    /// Returns `RepoError::NotFound` when no live session carries `prefix`.
    async fn revoke_session(
        &self,
        prefix: &str,
        revoked_at: OffsetDateTime,
    ) -> Result<SessionRecord, RepoError>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
