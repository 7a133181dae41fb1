//! `PostgreSQL` implementation of the `NotificationStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use void_core::error::DomainError;
use void_core::repository::User;
use void_core::store::{NewNotification, Notification, NotificationInbox, NotificationStore};

use crate::infrastructure;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, message, author_username, shout_id, read, created_at";

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    user_id: i64,
    message: String,
    author_username: String,
    shout_id: Option<i64>,
    read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            recipient_id: row.user_id,
            message: row.message,
            author_username: row.author_username,
            shout_id: row.shout_id,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed notification store.
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    /// Creates a new `PgNotificationStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn list_users_except(&self, excluded_user_id: i64) -> Result<Vec<User>, DomainError> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE id <> $1 ORDER BY id")
                .bind(excluded_user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(infrastructure)?;

        Ok(rows
            .into_iter()
            .map(|(id, username)| User { id, username })
            .collect())
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, DomainError> {
        let row: NotificationRow = sqlx::query_as(&format!(
            "INSERT INTO notifications (user_id, message, author_username, shout_id, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(notification.recipient_id)
        .bind(&notification.message)
        .bind(&notification.author_username)
        .bind(notification.shout_id)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(row.into())
    }
}

#[async_trait]
impl NotificationInbox for PgNotificationStore {
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>, DomainError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_read(
        &self,
        user_id: i64,
        notification_id: i64,
    ) -> Result<Notification, DomainError> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "UPDATE notifications SET read = TRUE \
             WHERE id = $1 AND user_id = $2 RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        row.map(Notification::from)
            .ok_or_else(|| DomainError::NotFound(format!("notification {notification_id}")))
    }
}
