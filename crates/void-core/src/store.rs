//! Notification store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::repository::User;

/// A notification row about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    /// User who receives the notification.
    pub recipient_id: i64,
    /// Preview text shown to the recipient.
    pub message: String,
    /// Display name of the shout's author.
    pub author_username: String,
    /// Originating shout, if any.
    pub shout_id: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Store-assigned identifier.
    pub id: i64,
    /// User who receives the notification.
    pub recipient_id: i64,
    /// Preview text shown to the recipient.
    pub message: String,
    /// Display name of the shout's author.
    pub author_username: String,
    /// Originating shout, if any.
    pub shout_id: Option<i64>,
    /// Whether the recipient has seen it. Always `false` on insert.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Reads and writes the fan-out handler needs.
///
/// Each call is its own unit of work; nothing wraps a whole fan-out in a
/// transaction.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Lists every user whose id is not `excluded_user_id`, ordered by id.
    async fn list_users_except(&self, excluded_user_id: i64) -> Result<Vec<User>, DomainError>;

    /// Inserts one unread notification and returns the stored row.
    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, DomainError>;
}

/// A recipient's view of their notifications.
#[async_trait]
pub trait NotificationInbox: Send + Sync {
    /// Lists `user_id`'s notifications, newest first.
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>, DomainError>;

    /// Marks one of `user_id`'s notifications as read and returns it.
    ///
    /// Returns `DomainError::NotFound` when the notification does not exist
    /// or belongs to someone else.
    async fn mark_read(
        &self,
        user_id: i64,
        notification_id: i64,
    ) -> Result<Notification, DomainError>;
}
