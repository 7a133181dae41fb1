//! `PostgreSQL` implementation of the `ShoutRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use void_core::error::DomainError;
use void_core::repository::{Shout, ShoutRepository, User};

use crate::infrastructure;

/// PostgreSQL-backed shout repository.
#[derive(Debug, Clone)]
pub struct PgShoutRepository {
    pool: PgPool,
}

impl PgShoutRepository {
    /// Creates a new `PgShoutRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShoutRepository for PgShoutRepository {
    async fn insert_shout(
        &self,
        user_id: i64,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Shout, DomainError> {
        let (id, user_id, content, created_at): (i64, i64, String, DateTime<Utc>) =
            sqlx::query_as(
                "INSERT INTO shouts (user_id, content, created_at) VALUES ($1, $2, $3) \
                 RETURNING id, user_id, content, created_at",
            )
            .bind(user_id)
            .bind(content)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    DomainError::NotFound(format!("user {user_id}"))
                }
                other => infrastructure(other),
            })?;

        debug!(shout_id = id, user_id, "inserted shout");
        Ok(Shout {
            id,
            user_id,
            content,
            created_at,
        })
    }

    async fn find_user(&self, user_id: i64) -> Result<User, DomainError> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(infrastructure)?;

        row.map(|(id, username)| User { id, username })
            .ok_or_else(|| DomainError::NotFound(format!("user {user_id}")))
    }
}
