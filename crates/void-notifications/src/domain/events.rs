//! Domain events for the notification context.

use serde::{Deserialize, Serialize};
use void_core::error::{DomainError, PipelineError};
use void_core::event::DomainEvent;
use void_core::repository::{Shout, User};

/// Media type of the encoded event.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Emitted after a shout row commits.
///
/// The author's username is copied in at publish time so the consumer never
/// has to join back to the user table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoutCreated {
    shout_id: i64,
    content: String,
    author_id: i64,
    author_username: String,
}

impl ShoutCreated {
    /// Builds the event, enforcing positive ids and non-empty text.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the first offending field.
    pub fn new(
        shout_id: i64,
        content: impl Into<String>,
        author_id: i64,
        author_username: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let content = content.into();
        let author_username = author_username.into();

        if shout_id <= 0 {
            return Err(DomainError::Validation(format!(
                "shout_id must be positive, got {shout_id}"
            )));
        }
        if author_id <= 0 {
            return Err(DomainError::Validation(format!(
                "user_id must be positive, got {author_id}"
            )));
        }
        if content.is_empty() {
            return Err(DomainError::Validation("content must not be empty".into()));
        }
        if author_username.is_empty() {
            return Err(DomainError::Validation("username must not be empty".into()));
        }

        Ok(Self {
            shout_id,
            content,
            author_id,
            author_username,
        })
    }

    /// Builds the event for a freshly committed shout and its loaded author.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the shout does not belong to
    /// `author` or any field fails [`ShoutCreated::new`].
    pub fn from_shout(shout: &Shout, author: &User) -> Result<Self, DomainError> {
        if shout.user_id != author.id {
            return Err(DomainError::Validation(format!(
                "shout {} belongs to user {}, not {}",
                shout.id, shout.user_id, author.id
            )));
        }
        Self::new(shout.id, shout.content.clone(), author.id, author.username.clone())
    }

    /// The shout this event describes.
    #[must_use]
    pub fn shout_id(&self) -> i64 {
        self.shout_id
    }

    /// The shout's text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The shout's author.
    #[must_use]
    pub fn author_id(&self) -> i64 {
        self.author_id
    }

    /// The author's display name at publish time.
    #[must_use]
    pub fn author_username(&self) -> &str {
        &self.author_username
    }
}

/// Borrowed wire form. Key names are part of the queue contract.
#[derive(Serialize)]
struct WireOut<'a> {
    shout_id: i64,
    content: &'a str,
    user_id: i64,
    username: &'a str,
}

#[derive(Deserialize)]
struct WireIn {
    shout_id: i64,
    content: String,
    user_id: i64,
    username: String,
}

impl DomainEvent for ShoutCreated {
    fn event_type(&self) -> &'static str {
        "notifications.shout_created"
    }

    fn content_type() -> &'static str {
        JSON_CONTENT_TYPE
    }

    fn encode(&self) -> Result<Vec<u8>, PipelineError> {
        let wire = WireOut {
            shout_id: self.shout_id,
            content: &self.content,
            user_id: self.author_id,
            username: &self.author_username,
        };
        serde_json::to_vec(&wire).map_err(|e| PipelineError::Encoding(e.to_string()))
    }

    fn decode(payload: &[u8]) -> Result<Self, PipelineError> {
        let wire: WireIn = serde_json::from_slice(payload)
            .map_err(|e| PipelineError::MalformedEvent(e.to_string()))?;
        Self::new(wire.shout_id, wire.content, wire.user_id, wire.username)
            .map_err(|e| PipelineError::MalformedEvent(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn alice_event() -> ShoutCreated {
        ShoutCreated::new(7, "hello world", 3, "alice").unwrap()
    }

    #[test]
    fn test_encode_uses_queue_contract_keys() {
        // Arrange
        let event = alice_event();

        // Act
        let bytes = event.encode().unwrap();

        // Assert
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "shout_id": 7,
                "content": "hello world",
                "user_id": 3,
                "username": "alice",
            })
        );
    }

    #[test]
    fn test_decode_inverts_encode() {
        let event = ShoutCreated::new(42, "ünïcödé — and \"quotes\"\n", 9, "bob").unwrap();

        let decoded = ShoutCreated::decode(&event.encode().unwrap()).unwrap();

        assert_eq!(decoded, event);
    }

    #[test]
    fn test_decode_missing_shout_id_is_malformed() {
        let payload = br#"{"content":"hi","user_id":3,"username":"alice"}"#;

        let result = ShoutCreated::decode(payload);

        match result {
            Err(PipelineError::MalformedEvent(reason)) => assert!(reason.contains("shout_id")),
            other => panic!("expected MalformedEvent, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_wrong_field_type_is_malformed() {
        let payload = br#"{"shout_id":"7","content":"hi","user_id":3,"username":"alice"}"#;

        assert!(matches!(
            ShoutCreated::decode(payload),
            Err(PipelineError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_decode_non_positive_id_is_malformed() {
        let payload = br#"{"shout_id":0,"content":"hi","user_id":3,"username":"alice"}"#;

        assert!(matches!(
            ShoutCreated::decode(payload),
            Err(PipelineError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(matches!(
            ShoutCreated::decode(b"not json at all"),
            Err(PipelineError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_decode_ignores_unknown_keys() {
        let payload =
            br#"{"shout_id":7,"content":"hi","user_id":3,"username":"alice","avatar":"a.png"}"#;

        let event = ShoutCreated::decode(payload).unwrap();

        assert_eq!(event.shout_id(), 7);
        assert_eq!(event.author_username(), "alice");
    }

    #[test]
    fn test_new_rejects_empty_content() {
        let result = ShoutCreated::new(1, "", 3, "alice");

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_from_shout_copies_author_username() {
        let shout = Shout {
            id: 11,
            user_id: 3,
            content: "first!".into(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        };
        let author = User {
            id: 3,
            username: "alice".into(),
        };

        let event = ShoutCreated::from_shout(&shout, &author).unwrap();

        assert_eq!(event.shout_id(), 11);
        assert_eq!(event.author_id(), 3);
        assert_eq!(event.content(), "first!");
        assert_eq!(event.author_username(), "alice");
    }

    #[test]
    fn test_from_shout_rejects_mismatched_author() {
        let shout = Shout {
            id: 11,
            user_id: 3,
            content: "first!".into(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        };
        let someone_else = User {
            id: 4,
            username: "dave".into(),
        };

        assert!(ShoutCreated::from_shout(&shout, &someone_else).is_err());
    }
}
