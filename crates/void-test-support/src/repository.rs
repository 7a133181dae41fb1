//! Test repositories — mock `ShoutRepository` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use void_core::error::DomainError;
use void_core::repository::{Shout, ShoutRepository, User};

/// A shout repository over a fixed user list that records inserted shouts,
/// assigning ids from 1.
#[derive(Debug)]
pub struct RecordingShoutRepository {
    users: Vec<User>,
    shouts: Mutex<Vec<Shout>>,
}

impl RecordingShoutRepository {
    /// Creates a repository whose registered users are `users`.
    #[must_use]
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users,
            shouts: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all inserted shouts.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn shouts(&self) -> Vec<Shout> {
        self.shouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShoutRepository for RecordingShoutRepository {
    async fn insert_shout(
        &self,
        user_id: i64,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Shout, DomainError> {
        let mut shouts = self.shouts.lock().unwrap();
        let shout = Shout {
            id: i64::try_from(shouts.len()).unwrap_or(i64::MAX - 1) + 1,
            user_id,
            content: content.to_owned(),
            created_at,
        };
        shouts.push(shout.clone());
        Ok(shout)
    }

    async fn find_user(&self, user_id: i64) -> Result<User, DomainError> {
        self.users
            .iter()
            .find(|user| user.id == user_id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("user {user_id}")))
    }
}

/// A shout repository that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingShoutRepository;

#[async_trait]
impl ShoutRepository for FailingShoutRepository {
    async fn insert_shout(
        &self,
        _user_id: i64,
        _content: &str,
        _created_at: DateTime<Utc>,
    ) -> Result<Shout, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn find_user(&self, _user_id: i64) -> Result<User, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
