//! PostgreSQL adapters for the notification pipeline.
//!
//! Provides the durable queue broker, the notification store, the shout
//! repository, and the embedded schema migrations they share.

pub mod pg_broker;
pub mod pg_notification_store;
pub mod pg_shout_repository;
pub mod schema;

use void_core::error::{DomainError, PipelineError};

/// Maps a sqlx error to a store-level error.
pub(crate) fn infrastructure(e: sqlx::Error) -> DomainError {
    match e {
        sqlx::Error::RowNotFound => DomainError::NotFound("row not found".into()),
        other => DomainError::Infrastructure(other.to_string()),
    }
}

/// Maps a sqlx error to a broker failure.
pub(crate) fn unavailable(e: sqlx::Error) -> PipelineError {
    PipelineError::BrokerUnavailable(e.to_string())
}
