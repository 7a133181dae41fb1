//! Error types shared by the notification pipeline and its adapters.

use thiserror::Error;

/// Errors raised by stores and repositories.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input rejected by a domain rule.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

/// Errors raised while moving a shout event from the write path to the
/// notification store.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The event could not be serialized; nothing was published.
    #[error("event encoding failed: {0}")]
    Encoding(String),

    /// The broker connection or channel failed during publish, consume,
    /// acknowledge or declare.
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// A delivered payload could not be decoded into an event.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The recipient set for an event could not be loaded.
    #[error("recipient query failed for shout {shout_id}: {source}")]
    RecipientQueryFailed {
        /// Shout whose fan-out was aborted.
        shout_id: i64,
        /// Underlying store error.
        #[source]
        source: DomainError,
    },

    /// A single notification row could not be written.
    #[error("notification insert failed for recipient {recipient_id}: {source}")]
    RecipientInsertFailed {
        /// Recipient that was skipped.
        recipient_id: i64,
        /// Underlying store error.
        #[source]
        source: DomainError,
    },
}
