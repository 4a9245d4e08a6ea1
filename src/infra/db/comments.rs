use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{CommentsRepo, CreateCommentParams, RepoError},
    domain::entities::{AuthorRef, CommentRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    text: String,
    created_at: OffsetDateTime,
    author_id: i64,
    author_username: String,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            text: row.text,
            created_at: row.created_at,
            author: AuthorRef {
                id: row.author_id,
                username: row.author_username,
            },
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT c.id, c.post_id, c.text, c.created_at,
                   u.id AS author_id, u.username AS author_username
            FROM comments c
            INNER JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (post_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING id, post_id, author_id, text, created_at
            )
            SELECT i.id, i.post_id, i.text, i.created_at,
                   u.id AS author_id, u.username AS author_username
            FROM inserted i
            INNER JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(params.post_id)
        .bind(params.author_id)
        .bind(params.text)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
