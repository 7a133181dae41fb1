//! Shout repository abstraction used by the write path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A registered user, as far as the pipeline needs to know one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier.
    pub id: i64,
    /// Unique display name.
    pub username: String,
}

/// A persisted shout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shout {
    /// Store-assigned identifier.
    pub id: i64,
    /// Author of the shout.
    pub user_id: i64,
    /// Author-supplied text.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Persistence for shouts and their authors.
#[async_trait]
pub trait ShoutRepository: Send + Sync {
    /// Inserts a shout and returns the committed row.
    async fn insert_shout(
        &self,
        user_id: i64,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Shout, DomainError>;

    /// Loads a user by id.
    ///
    /// Returns `DomainError::NotFound` when no such user exists.
    async fn find_user(&self, user_id: i64) -> Result<User, DomainError>;
}
