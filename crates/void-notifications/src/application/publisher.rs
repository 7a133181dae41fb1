//! Publishes `ShoutCreated` events to the durable notification queue.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use void_core::broker::{Broker, SHOUT_NOTIFICATIONS_QUEUE};
use void_core::error::PipelineError;
use void_core::event::DomainEvent;

use crate::domain::events::ShoutCreated;

/// Producer side of the notification pipeline.
///
/// Callers must persist the shout before publishing; a failed publish never
/// undoes that write.
#[derive(Clone)]
pub struct ShoutPublisher {
    broker: Arc<dyn Broker>,
}

impl ShoutPublisher {
    /// Creates a publisher over `broker`.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    /// Declares the notification queue. Safe to call on every startup.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BrokerUnavailable` if the broker cannot be
    /// reached.
    pub async fn declare(&self) -> Result<(), PipelineError> {
        self.broker.declare_queue(SHOUT_NOTIFICATIONS_QUEUE).await
    }

    /// Encodes `event` and enqueues exactly one message for it. No retry.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Encoding` if the event cannot be serialized,
    /// or `PipelineError::BrokerUnavailable` if the broker rejects the
    /// publish.
    #[instrument(skip_all, fields(shout_id = event.shout_id(), event_type = event.event_type()))]
    pub async fn publish(&self, event: &ShoutCreated) -> Result<(), PipelineError> {
        let payload = event
            .encode()
            .inspect_err(|e| warn!(error = %e, "failed to encode shout event"))?;

        self.broker
            .publish(
                SHOUT_NOTIFICATIONS_QUEUE,
                ShoutCreated::content_type(),
                &payload,
            )
            .await
            .inspect_err(|e| warn!(error = %e, "failed to publish shout event"))?;

        info!("published shout event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_test_support::{FailingBroker, InMemoryBroker};

    #[tokio::test]
    async fn test_publish_enqueues_one_json_message() {
        // Arrange
        let broker = InMemoryBroker::new();
        let publisher = ShoutPublisher::new(Arc::new(broker.clone()));
        publisher.declare().await.unwrap();
        let event = ShoutCreated::new(7, "hello world", 3, "alice").unwrap();

        // Act
        publisher.publish(&event).await.unwrap();

        // Assert
        let published = broker.published(SHOUT_NOTIFICATIONS_QUEUE);
        assert_eq!(published.len(), 1);
        let (content_type, payload) = &published[0];
        assert_eq!(content_type, "application/json");
        assert_eq!(ShoutCreated::decode(payload).unwrap(), event);
        assert_eq!(broker.ready_count(SHOUT_NOTIFICATIONS_QUEUE), 1);
    }

    #[tokio::test]
    async fn test_declare_is_idempotent() {
        let broker = InMemoryBroker::new();
        let publisher = ShoutPublisher::new(Arc::new(broker.clone()));
        let event = ShoutCreated::new(7, "hello world", 3, "alice").unwrap();

        publisher.declare().await.unwrap();
        publisher.publish(&event).await.unwrap();
        publisher.declare().await.unwrap();

        assert_eq!(broker.ready_count(SHOUT_NOTIFICATIONS_QUEUE), 1);
    }

    #[tokio::test]
    async fn test_publish_surfaces_broker_failure() {
        let publisher = ShoutPublisher::new(Arc::new(FailingBroker));
        let event = ShoutCreated::new(7, "hello world", 3, "alice").unwrap();

        let result = publisher.publish(&event).await;

        assert!(matches!(result, Err(PipelineError::BrokerUnavailable(_))));
    }
}
