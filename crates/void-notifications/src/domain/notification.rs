//! Rules for deriving a notification row from a shout event.

use chrono::{DateTime, Utc};
use void_core::repository::User;
use void_core::store::NewNotification;

use super::events::ShoutCreated;

/// Longest shout prefix copied into a notification message.
pub const MESSAGE_PREVIEW_LEN: usize = 50;

/// Appended to a message when the shout was cut short.
pub const ELLIPSIS: &str = "...";

/// Shortens `content` to at most `limit` characters, appending [`ELLIPSIS`]
/// when anything was dropped.
///
/// Length is counted in Unicode scalar values, not grapheme clusters, so a
/// combining sequence may be split; a multi-byte character never is.
#[must_use]
pub fn truncate_message(content: &str, limit: usize) -> String {
    match content.char_indices().nth(limit) {
        Some((cut, _)) => {
            let mut message = String::with_capacity(cut + ELLIPSIS.len());
            message.push_str(&content[..cut]);
            message.push_str(ELLIPSIS);
            message
        }
        None => content.to_owned(),
    }
}

/// Builds the notification `recipient` receives for `event`.
#[must_use]
pub fn notification_for(
    event: &ShoutCreated,
    recipient: &User,
    created_at: DateTime<Utc>,
) -> NewNotification {
    NewNotification {
        recipient_id: recipient.id,
        message: truncate_message(event.content(), MESSAGE_PREVIEW_LEN),
        author_username: event.author_username().to_owned(),
        shout_id: Some(event.shout_id()),
        created_at,
    }
}
