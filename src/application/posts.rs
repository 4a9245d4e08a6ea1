//! Read side: filtered, paginated post listings and post detail.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use crate::application::pagination::{Page, PageNumber, Paginator};
use crate::application::repos::{
    CommentsRepo, GroupsRepo, PostScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error("unknown post `{0}`")]
    UnknownPost(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupListing {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct AuthorListing {
    pub author: UserRecord,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub comments: Vec<CommentRecord>,
}

#[derive(Clone)]
pub struct PostQueryService {
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    paginator: Paginator,
}

impl PostQueryService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        groups: Arc<dyn GroupsRepo>,
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            users,
            groups,
            posts,
            comments,
            paginator,
        }
    }

    pub fn paginator(&self) -> Paginator {
        self.paginator
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self, page: PageNumber) -> Result<Page<PostRecord>, QueryError> {
        self.page_of(PostScope::All, page).await
    }

    #[instrument(skip(self))]
    pub async fn list_by_group(
        &self,
        slug: &str,
        page: PageNumber,
    ) -> Result<GroupListing, QueryError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| QueryError::UnknownGroup(slug.to_string()))?;
        let page = self.page_of(PostScope::Group(group.id), page).await?;
        Ok(GroupListing { group, page })
    }

    #[instrument(skip(self))]
    pub async fn list_by_author(
        &self,
        username: &str,
        page: PageNumber,
    ) -> Result<AuthorListing, QueryError> {
        let author = self.find_author(username).await?;
        let page = self.page_of(PostScope::Author(author.id), page).await?;
        Ok(AuthorListing { author, page })
    }

    /// Posts by everyone `user` follows. Following nobody yields an empty page.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn list_feed(
        &self,
        user: &UserRecord,
        page: PageNumber,
    ) -> Result<Page<PostRecord>, QueryError> {
        self.page_of(PostScope::FollowedBy(user.id), page).await
    }

    #[instrument(skip(self))]
    pub async fn post_detail(&self, id: i64) -> Result<PostDetail, QueryError> {
        let post = self.find_post(id).await?;
        let comments = self.comments.list_for_post(post.id).await?;
        Ok(PostDetail { post, comments })
    }

    pub async fn find_post(&self, id: i64) -> Result<PostRecord, QueryError> {
        self.posts
            .find_post(id)
            .await?
            .ok_or(QueryError::UnknownPost(id))
    }

    pub async fn find_author(&self, username: &str) -> Result<UserRecord, QueryError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| QueryError::UnknownAuthor(username.to_string()))
    }

    async fn page_of(
        &self,
        scope: PostScope,
        requested: PageNumber,
    ) -> Result<Page<PostRecord>, QueryError> {
        let total = self.posts.count_posts(scope).await?;
        let window = self.paginator.window(total, requested);
        let items = if total == 0 {
            Vec::new()
        } else {
            self.posts.list_posts(scope, window).await?
        };
        Ok(Page::new(items, window, total))
    }
}
