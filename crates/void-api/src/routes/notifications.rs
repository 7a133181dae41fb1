//! Routes for reading a user's notifications.

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;
use void_core::store::Notification;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for GET /{user_id}/notifications.
#[derive(Debug, Serialize)]
pub struct InboxResponse {
    /// The user's notifications, newest first.
    pub notifications: Vec<Notification>,
    /// How many of them are unread.
    pub unread_count: usize,
}

/// GET /{user_id}/notifications
#[instrument(skip(state))]
async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<InboxResponse>, ApiError> {
    let notifications = state.notification_inbox.list_for_user(user_id).await?;
    let unread_count = notifications.iter().filter(|n| !n.read).count();

    Ok(Json(InboxResponse {
        notifications,
        unread_count,
    }))
}

/// POST /{user_id}/notifications/{notification_id}/read
#[instrument(skip(state))]
async fn mark_read(
    State(state): State<AppState>,
    Path((user_id, notification_id)): Path<(i64, i64)>,
) -> Result<Json<Notification>, ApiError> {
    let notification = state
        .notification_inbox
        .mark_read(user_id, notification_id)
        .await?;
    Ok(Json(notification))
}

/// Returns the router for notification inboxes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}/notifications", get(list_notifications))
        .route(
            "/{user_id}/notifications/{notification_id}/read",
            post(mark_read),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use serde_json::Value;
    use tower::ServiceExt;
    use void_core::store::{NewNotification, NotificationInbox, NotificationStore};
    use void_notifications::application::publisher::ShoutPublisher;
    use void_test_support::{
        FailingBroker, FailingNotificationStore, FixedClock, RecordingNotificationStore,
        RecordingShoutRepository,
    };

    fn app_state_with(inbox: Arc<dyn NotificationInbox>) -> AppState {
        AppState::new(
            Arc::new(FixedClock::reference()),
            Arc::new(RecordingShoutRepository::new(vec![])),
            inbox,
            ShoutPublisher::new(Arc::new(FailingBroker)),
        )
    }

    async fn seeded_store() -> Arc<RecordingNotificationStore> {
        let store = Arc::new(RecordingNotificationStore::with_user_ids(&[1, 2]));
        let base = FixedClock::reference().0;
        for (minutes, message) in [(0, "older"), (5, "newer")] {
            store
                .insert_notification(&NewNotification {
                    recipient_id: 2,
                    message: message.into(),
                    author_username: "user1".into(),
                    shout_id: Some(1),
                    created_at: base + Duration::minutes(minutes),
                })
                .await
                .unwrap();
        }
        store
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn test_list_notifications_newest_first_with_unread_count() {
        // Arrange
        let store = seeded_store().await;
        let app = router().with_state(app_state_with(store));

        // Act
        let (status, json) = send(app, "GET", "/2/notifications").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["unread_count"], 2);
        let messages: Vec<&str> = json["notifications"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["message"].as_str().unwrap())
            .collect();
        assert_eq!(messages, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn test_list_notifications_for_user_without_any_is_empty() {
        let store = seeded_store().await;
        let app = router().with_state(app_state_with(store));

        let (status, json) = send(app, "GET", "/1/notifications").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["unread_count"], 0);
        assert!(json["notifications"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_returns_updated_notification() {
        // Arrange
        let store = seeded_store().await;
        let app = router().with_state(app_state_with(store.clone()));

        // Act
        let (status, json) = send(app, "POST", "/2/notifications/1/read").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], 1);
        assert_eq!(json["read"], true);
        let unread = store
            .notifications()
            .iter()
            .filter(|n| !n.read)
            .count();
        assert_eq!(unread, 1);
    }

    #[tokio::test]
    async fn test_mark_read_of_other_users_notification_returns_404() {
        let store = seeded_store().await;
        let app = router().with_state(app_state_with(store));

        let (status, json) = send(app, "POST", "/1/notifications/1/read").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
    }

    #[tokio::test]
    async fn test_list_notifications_store_failure_returns_500() {
        let app = router().with_state(app_state_with(Arc::new(FailingNotificationStore)));

        let (status, _) = send(app, "GET", "/2/notifications").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
