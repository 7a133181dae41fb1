//! Database schema.

use sqlx::migrate::Migrator;

/// Migrations under the workspace `migrations/` directory, embedded at
/// compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
