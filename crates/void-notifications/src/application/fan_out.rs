//! Turns one `ShoutCreated` event into a notification per other user.

use std::sync::Arc;

use futures::{StreamExt, stream};
use tracing::{debug, error, info, instrument, warn};
use void_core::clock::Clock;
use void_core::error::PipelineError;
use void_core::repository::User;
use void_core::store::{NewNotification, NotificationStore};

use crate::domain::events::ShoutCreated;
use crate::domain::notification::notification_for;

/// Result of fanning out one event. Informational only: the consumer
/// acknowledges the delivery whichever variant comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOutOutcome {
    /// The recipient set could not be loaded; nothing was written.
    Aborted,
    /// Every recipient was attempted.
    Completed {
        /// Users other than the author.
        recipients: usize,
        /// Notifications written.
        notified: usize,
        /// Recipients whose insert failed, in recipient order.
        failed: Vec<i64>,
    },
}

/// Broadcasts a shout to every registered user except its author.
///
/// Best-effort per recipient: a failed insert is logged and skipped. Only a
/// failed recipient query aborts the event.
#[derive(Clone)]
pub struct FanOutHandler {
    store: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl FanOutHandler {
    /// Creates a handler that inserts one notification at a time.
    #[must_use]
    pub fn new(store: Arc<dyn NotificationStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            concurrency: 1,
        }
    }

    /// Allows up to `concurrency` inserts in flight (minimum 1). Failures stay
    /// independent per recipient.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Writes one notification per recipient of `event`.
    #[instrument(skip_all, fields(shout_id = event.shout_id(), author_id = event.author_id()))]
    pub async fn fan_out(&self, event: &ShoutCreated) -> FanOutOutcome {
        let users = match self.store.list_users_except(event.author_id()).await {
            Ok(users) => users,
            Err(source) => {
                let err = PipelineError::RecipientQueryFailed {
                    shout_id: event.shout_id(),
                    source,
                };
                error!(error = %err, "aborting fan-out");
                return FanOutOutcome::Aborted;
            }
        };

        let recipients: Vec<User> = users
            .into_iter()
            .filter(|user| user.id != event.author_id())
            .collect();
        info!(recipients = recipients.len(), "creating notifications");

        let created_at = self.clock.now();
        let pending: Vec<NewNotification> = recipients
            .iter()
            .map(|recipient| notification_for(event, recipient, created_at))
            .collect();
        let store = Arc::clone(&self.store);
        let results: Vec<(i64, bool)> = stream::iter(pending)
            .map(move |notification| notify(Arc::clone(&store), notification))
            .buffered(self.concurrency)
            .collect()
            .await;

        let failed: Vec<i64> = results
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(id, _)| *id)
            .collect();
        let outcome = FanOutOutcome::Completed {
            recipients: recipients.len(),
            notified: results.len() - failed.len(),
            failed,
        };
        info!(?outcome, "fan-out finished");
        outcome
    }
}

/// Inserts one notification. Takes owned inputs: the future must not borrow
/// from `fan_out`'s stack.
async fn notify(store: Arc<dyn NotificationStore>, notification: NewNotification) -> (i64, bool) {
    let recipient_id = notification.recipient_id;
    match store.insert_notification(&notification).await {
        Ok(stored) => {
            debug!(
                notification_id = stored.id,
                recipient_id, "created notification"
            );
            (recipient_id, true)
        }
        Err(source) => {
            let err = PipelineError::RecipientInsertFailed {
                recipient_id,
                source,
            };
            warn!(error = %err, "skipping recipient");
            (recipient_id, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_test_support::{FailingNotificationStore, FixedClock, RecordingNotificationStore};

    fn handler_over(store: &Arc<RecordingNotificationStore>) -> FanOutHandler {
        FanOutHandler::new(store.clone(), Arc::new(FixedClock::reference()))
    }

    #[tokio::test]
    async fn test_fan_out_notifies_every_user_but_the_author() {
        // Arrange
        let store = Arc::new(RecordingNotificationStore::with_user_ids(&[1, 2, 3, 4]));
        let handler = handler_over(&store);
        let event = ShoutCreated::new(7, "hello world", 3, "alice").unwrap();

        // Act
        let outcome = handler.fan_out(&event).await;

        // Assert
        assert_eq!(
            outcome,
            FanOutOutcome::Completed {
                recipients: 3,
                notified: 3,
                failed: vec![],
            }
        );
        let notifications = store.notifications();
        let recipients: Vec<i64> = notifications.iter().map(|n| n.recipient_id).collect();
        assert_eq!(recipients, vec![1, 2, 4]);
        for n in &notifications {
            assert_eq!(n.message, "hello world");
            assert_eq!(n.author_username, "alice");
            assert_eq!(n.shout_id, Some(7));
            assert!(!n.read);
            assert_eq!(n.created_at, FixedClock::reference().0);
        }
    }

    #[tokio::test]
    async fn test_fan_out_truncates_long_content() {
        let store = Arc::new(RecordingNotificationStore::with_user_ids(&[1, 2]));
        let handler = handler_over(&store);
        let event = ShoutCreated::new(8, "x".repeat(60), 1, "alice").unwrap();

        handler.fan_out(&event).await;

        let notifications = store.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, format!("{}...", "x".repeat(50)));
    }

    #[tokio::test]
    async fn test_fan_out_with_no_other_users_writes_nothing() {
        let store = Arc::new(RecordingNotificationStore::with_user_ids(&[3]));
        let handler = handler_over(&store);
        let event = ShoutCreated::new(7, "anyone there?", 3, "alice").unwrap();

        let outcome = handler.fan_out(&event).await;

        assert_eq!(
            outcome,
            FanOutOutcome::Completed {
                recipients: 0,
                notified: 0,
                failed: vec![],
            }
        );
        assert!(store.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_insert_failure_skips_only_that_recipient() {
        // Arrange
        let store = Arc::new(
            RecordingNotificationStore::with_user_ids(&[1, 2, 3, 4]).failing_inserts_for(2),
        );
        let handler = handler_over(&store);
        let event = ShoutCreated::new(7, "hello world", 3, "alice").unwrap();

        // Act
        let outcome = handler.fan_out(&event).await;

        // Assert
        assert_eq!(
            outcome,
            FanOutOutcome::Completed {
                recipients: 3,
                notified: 2,
                failed: vec![2],
            }
        );
        let recipients: Vec<i64> = store
            .notifications()
            .iter()
            .map(|n| n.recipient_id)
            .collect();
        assert_eq!(recipients, vec![1, 4]);
    }

    #[tokio::test]
    async fn test_recipient_query_failure_aborts() {
        let handler = FanOutHandler::new(
            Arc::new(FailingNotificationStore),
            Arc::new(FixedClock::reference()),
        );
        let event = ShoutCreated::new(7, "hello world", 3, "alice").unwrap();

        assert_eq!(handler.fan_out(&event).await, FanOutOutcome::Aborted);
    }

    #[tokio::test]
    async fn test_concurrent_fan_out_keeps_failures_independent() {
        let ids: Vec<i64> = (1..=20).collect();
        let store = Arc::new(
            RecordingNotificationStore::with_user_ids(&ids)
                .failing_inserts_for(5)
                .failing_inserts_for(13),
        );
        let handler = handler_over(&store).with_concurrency(4);
        let event = ShoutCreated::new(9, "busy day", 1, "user1").unwrap();

        let outcome = handler.fan_out(&event).await;

        assert_eq!(
            outcome,
            FanOutOutcome::Completed {
                recipients: 19,
                notified: 17,
                failed: vec![5, 13],
            }
        );
        assert!(
            store
                .notifications()
                .iter()
                .all(|n| n.recipient_id != event.author_id())
        );
    }
}
