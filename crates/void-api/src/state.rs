//! Shared application state.

use std::sync::Arc;

use void_core::clock::Clock;
use void_core::repository::ShoutRepository;
use void_core::store::NotificationInbox;
use void_notifications::application::publisher::ShoutPublisher;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock stamped onto new shouts.
    pub clock: Arc<dyn Clock>,
    /// Shout persistence for the write path.
    pub shout_repository: Arc<dyn ShoutRepository>,
    /// Read side of delivered notifications.
    pub notification_inbox: Arc<dyn NotificationInbox>,
    /// Producer for `ShoutCreated` events.
    pub publisher: ShoutPublisher,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        shout_repository: Arc<dyn ShoutRepository>,
        notification_inbox: Arc<dyn NotificationInbox>,
        publisher: ShoutPublisher,
    ) -> Self {
        Self {
            clock,
            shout_repository,
            notification_inbox,
            publisher,
        }
    }
}
