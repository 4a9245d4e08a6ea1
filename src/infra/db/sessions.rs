use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateSessionParams, RepoError, SessionsRepo},
    domain::entities::SessionRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: i64,
    prefix: String,
    hashed_secret: Vec<u8>,
    created_at: OffsetDateTime,
    expires_at: Option<OffsetDateTime>,
    revoked_at: Option<OffsetDateTime>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            prefix: row.prefix,
            hashed_secret: row.hashed_secret,
            created_at: row.created_at,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
        }
    }
}

#[async_trait]
impl SessionsRepo for PostgresRepositories {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (id, user_id, prefix, hashed_secret, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, prefix, hashed_secret, created_at, expires_at, revoked_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.user_id)
        .bind(params.prefix)
        .bind(params.hashed_secret)
        .bind(params.expires_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, prefix, hashed_secret, created_at, expires_at, revoked_at
            FROM sessions
            WHERE prefix = $1
            "#,
        )
        .bind(prefix)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SessionRecord::from))
    }

    async fn revoke_session(
        &self,
        prefix: &str,
        revoked_at: OffsetDateTime,
    ) -> Result<SessionRecord, RepoError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE sessions
            SET revoked_at = $2
            WHERE prefix = $1 AND revoked_at IS NULL
            RETURNING id, user_id, prefix, hashed_secret, created_at, expires_at, revoked_at
            "#,
        )
        .bind(prefix)
        .bind(revoked_at)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(SessionRecord::from).ok_or(RepoError::NotFound)
    }
}
