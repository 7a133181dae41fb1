//! Commands for the notification context.

use uuid::Uuid;

/// Command to post a new shout on behalf of a user.
#[derive(Debug, Clone)]
pub struct CreateShout {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The authoring user.
    pub author_id: i64,
    /// The shout text.
    pub content: String,
}
