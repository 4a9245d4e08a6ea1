use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::{
        pagination::PageWindow,
        repos::{
            CreatePostParams, PostScope, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
        },
    },
    domain::entities::{AuthorRef, GroupRef, PostRecord},
};

use super::{PostgresRepositories, map_sqlx_error, util::convert_count};

const POST_SELECT: &str = r#"
    SELECT
        p.id,
        p.text,
        p.image,
        p.created_at,
        u.id AS author_id,
        u.username AS author_username,
        g.id AS group_id,
        g.slug AS group_slug,
        g.title AS group_title
    FROM posts p
    INNER JOIN users u ON u.id = p.author_id
    LEFT JOIN groups g ON g.id = p.group_id
"#;

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    image: Option<String>,
    created_at: OffsetDateTime,
    author_id: i64,
    author_username: String,
    group_id: Option<i64>,
    group_slug: Option<String>,
    group_title: Option<String>,
}

impl TryFrom<PostRow> for PostRecord {
    type Error = RepoError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRef { id, slug, title }),
            (None, None, None) => None,
            _ => {
                return Err(RepoError::Integrity {
                    message: format!("post `{}` references a partially loaded group", row.id),
                });
            }
        };

        Ok(Self {
            id: row.id,
            text: row.text,
            image: row.image,
            created_at: row.created_at,
            author: AuthorRef {
                id: row.author_id,
                username: row.author_username,
            },
            group,
        })
    }
}

impl PostgresRepositories {
    fn apply_post_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: PostScope) {
        match scope {
            PostScope::All => {}
            PostScope::Group(group_id) => {
                qb.push(" AND p.group_id = ");
                qb.push_bind(group_id);
            }
            PostScope::Author(author_id) => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(author_id);
            }
            PostScope::FollowedBy(user_id) => {
                qb.push(" AND p.author_id IN ");
                qb.push("(SELECT f.author_id FROM follows f WHERE f.user_id = ");
                qb.push_bind(user_id);
                qb.push(")");
            }
        }
    }

    async fn fetch_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        qb.push(" WHERE p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(PostRecord::try_from).transpose()
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p WHERE TRUE");
        Self::apply_post_scope(&mut qb, scope);

        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        convert_count(count)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let offset = i64::try_from(window.offset).map_err(|_| RepoError::InvalidInput {
            message: "page offset exceeds supported range".to_string(),
        })?;

        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        qb.push(" WHERE TRUE");
        Self::apply_post_scope(&mut qb, scope);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(window.limit));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(PostRecord::try_from).collect()
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        self.fetch_post(id).await
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (author_id, text, group_id, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(params.author_id)
        .bind(params.text)
        .bind(params.group_id)
        .bind(params.image)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.fetch_post(id).await?.ok_or(RepoError::NotFound)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let updated = sqlx::query(
            r#"
            UPDATE posts
            SET text = $2, group_id = $3, image = $4
            WHERE id = $1
            "#,
        )
        .bind(params.id)
        .bind(params.text)
        .bind(params.group_id)
        .bind(params.image)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        self.fetch_post(params.id).await?.ok_or(RepoError::NotFound)
    }
}
