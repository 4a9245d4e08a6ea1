//! Write side: creating and editing posts, adding comments.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::posts::{CommentInput, FieldErrors, PostInput};

#[derive(Debug, Error)]
pub enum PostWriteError {
    #[error("post `{0}` not found")]
    PostNotFound(i64),
    #[error("post `{post_id}` is not authored by user `{user_id}`")]
    NotAuthor { post_id: i64, user_id: i64 },
    #[error("invalid input: {0}")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct PostService {
    groups: Arc<dyn GroupsRepo>,
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl PostService {
    pub fn new(
        groups: Arc<dyn GroupsRepo>,
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            groups,
            posts,
            writer,
            comments,
        }
    }

    /// Groups offered by the post form.
    pub async fn list_groups(&self) -> Result<Vec<GroupRecord>, PostWriteError> {
        Ok(self.groups.list_groups().await?)
    }

    #[instrument(skip_all, fields(author = author.id))]
    pub async fn create_post(
        &self,
        author: &UserRecord,
        input: PostInput,
    ) -> Result<PostRecord, PostWriteError> {
        self.ensure_group_exists(input.group_id()).await?;
        let (text, group_id, image) = input.into_parts();

        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id: author.id,
                text,
                group_id,
                image,
            })
            .await?;

        info!(
            target = "yatube::authoring",
            post_id = post.id,
            "post created"
        );
        Ok(post)
    }

    /// Load a post for editing, refusing anyone but its author.
    pub async fn ensure_editable(
        &self,
        editor: &UserRecord,
        post_id: i64,
    ) -> Result<PostRecord, PostWriteError> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostWriteError::PostNotFound(post_id))?;
        if !post.is_authored_by(editor) {
            return Err(PostWriteError::NotAuthor {
                post_id,
                user_id: editor.id,
            });
        }
        Ok(post)
    }

    #[instrument(skip_all, fields(editor = editor.id, post_id))]
    pub async fn edit_post(
        &self,
        editor: &UserRecord,
        post_id: i64,
        input: PostInput,
    ) -> Result<PostRecord, PostWriteError> {
        self.ensure_editable(editor, post_id).await?;
        self.ensure_group_exists(input.group_id()).await?;
        let (text, group_id, image) = input.into_parts();

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id: post_id,
                text,
                group_id,
                image,
            })
            .await
            .map_err(|err| match err {
                RepoError::NotFound => PostWriteError::PostNotFound(post_id),
                other => PostWriteError::Repo(other),
            })?;

        info!(target = "yatube::authoring", post_id, "post updated");
        Ok(post)
    }

    #[instrument(skip_all, fields(author = author.id, post_id))]
    pub async fn add_comment(
        &self,
        author: &UserRecord,
        post_id: i64,
        input: CommentInput,
    ) -> Result<CommentRecord, PostWriteError> {
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(PostWriteError::PostNotFound(post_id));
        }

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id: author.id,
                text: input.into_text(),
            })
            .await?;

        info!(
            target = "yatube::authoring",
            comment_id = comment.id,
            "comment added"
        );
        Ok(comment)
    }

    async fn ensure_group_exists(&self, group_id: Option<i64>) -> Result<(), PostWriteError> {
        let Some(group_id) = group_id else {
            return Ok(());
        };
        match self.groups.find_by_id(group_id).await? {
            Some(_) => Ok(()),
            None => Err(PostWriteError::Invalid(FieldErrors::unknown_group())),
        }
    }
}
