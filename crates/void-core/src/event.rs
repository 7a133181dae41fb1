//! Domain event abstractions.

use crate::error::PipelineError;

/// An event that travels through the durable queue as a byte payload.
///
/// Implementations must satisfy `decode(&encode(e)?)? == e` for every value
/// that passed construction-time validation.
pub trait DomainEvent: Send + Sync + std::fmt::Debug + Sized {
    /// Returns the event type name (used for logging and routing).
    fn event_type(&self) -> &'static str;

    /// Media type declared on the published message.
    fn content_type() -> &'static str;

    /// Serializes the event into its wire representation.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Encoding` if serialization fails.
    fn encode(&self) -> Result<Vec<u8>, PipelineError>;

    /// Parses a wire payload back into the event.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::MalformedEvent` if required fields are missing
    /// or of the wrong shape.
    fn decode(payload: &[u8]) -> Result<Self, PipelineError>;
}
