//! Test stores — mock `NotificationStore` and `NotificationInbox`
//! implementations for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use void_core::error::DomainError;
use void_core::repository::User;
use void_core::store::{NewNotification, Notification, NotificationInbox, NotificationStore};

/// A notification store backed by a fixed user list. Records every inserted
/// notification, assigning ids from 1, and can be told to fail inserts for
/// particular recipients.
#[derive(Debug)]
pub struct RecordingNotificationStore {
    users: Vec<User>,
    failing_recipients: HashSet<i64>,
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotificationStore {
    /// Creates a store whose registered users are `users`.
    #[must_use]
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users,
            failing_recipients: HashSet::new(),
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// Creates a store with users `ids`, named `user{id}`.
    #[must_use]
    pub fn with_user_ids(ids: &[i64]) -> Self {
        Self::new(
            ids.iter()
                .map(|&id| User {
                    id,
                    username: format!("user{id}"),
                })
                .collect(),
        )
    }

    /// Makes every insert for `recipient_id` fail with an infrastructure
    /// error.
    #[must_use]
    pub fn failing_inserts_for(mut self, recipient_id: i64) -> Self {
        self.failing_recipients.insert(recipient_id);
        self
    }

    /// Returns a snapshot of all notifications inserted so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationStore for RecordingNotificationStore {
    async fn list_users_except(&self, excluded_user_id: i64) -> Result<Vec<User>, DomainError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|user| user.id != excluded_user_id)
            .cloned()
            .collect();
        users.sort_by_key(|user| user.id);
        Ok(users)
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, DomainError> {
        if self.failing_recipients.contains(&notification.recipient_id) {
            return Err(DomainError::Infrastructure(format!(
                "insert rejected for recipient {}",
                notification.recipient_id
            )));
        }

        let mut notifications = self.notifications.lock().unwrap();
        let stored = Notification {
            id: i64::try_from(notifications.len()).unwrap_or(i64::MAX - 1) + 1,
            recipient_id: notification.recipient_id,
            message: notification.message.clone(),
            author_username: notification.author_username.clone(),
            shout_id: notification.shout_id,
            read: false,
            created_at: notification.created_at,
        };
        notifications.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl NotificationInbox for RecordingNotificationStore {
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>, DomainError> {
        let mut mine: Vec<Notification> = self
            .notifications()
            .into_iter()
            .filter(|n| n.recipient_id == user_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(mine)
    }

    async fn mark_read(
        &self,
        user_id: i64,
        notification_id: i64,
    ) -> Result<Notification, DomainError> {
        let mut notifications = self.notifications.lock().unwrap();
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.recipient_id == user_id)
            .ok_or_else(|| DomainError::NotFound(format!("notification {notification_id}")))?;
        notification.read = true;
        Ok(notification.clone())
    }
}

/// A notification store whose every query fails with an infrastructure
/// error.
#[derive(Debug)]
pub struct FailingNotificationStore;

#[async_trait]
impl NotificationStore for FailingNotificationStore {
    async fn list_users_except(&self, _excluded_user_id: i64) -> Result<Vec<User>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn insert_notification(
        &self,
        _notification: &NewNotification,
    ) -> Result<Notification, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

#[async_trait]
impl NotificationInbox for FailingNotificationStore {
    async fn list_for_user(&self, _user_id: i64) -> Result<Vec<Notification>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn mark_read(
        &self,
        _user_id: i64,
        _notification_id: i64,
    ) -> Result<Notification, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
