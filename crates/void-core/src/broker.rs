//! Durable queue broker port.
//!
//! The pipeline talks to its message broker only through [`Broker`]: declare
//! a named durable queue, publish bytes to it, and consume it as a stream of
//! [`Delivery`] values that must each be acknowledged or rejected exactly
//! once.

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::PipelineError;

/// Well-known durable queue carrying `ShoutCreated` events.
pub const SHOUT_NOTIFICATIONS_QUEUE: &str = "shout_notifications";

/// Stream of deliveries from a queue subscription. The stream ends when the
/// subscription is closed by the broker.
pub type DeliveryStream = BoxStream<'static, Result<Delivery, PipelineError>>;

/// Broker-side half of a delivery's acknowledgement handle.
#[async_trait]
pub trait Acknowledger: Send + Sync + fmt::Debug {
    /// Removes the message from the queue.
    async fn ack(&self) -> Result<(), PipelineError>;

    /// Rejects the message. With `requeue` the broker redelivers it;
    /// without, the broker drops or dead-letters it.
    async fn nack(&self, requeue: bool) -> Result<(), PipelineError>;
}

/// A message handed to a consumer under manual acknowledgement.
///
/// `ack` and `nack` take `self`, so a delivery is resolved at most once.
/// Dropping it unresolved leaves the message with the broker, which
/// redelivers it once the consumer's lease or connection is gone.
#[derive(Debug)]
pub struct Delivery {
    payload: Vec<u8>,
    redelivery_count: u32,
    acknowledger: Box<dyn Acknowledger>,
}

impl Delivery {
    /// Creates a delivery. Called by broker adapters.
    #[must_use]
    pub fn new(
        payload: Vec<u8>,
        redelivery_count: u32,
        acknowledger: Box<dyn Acknowledger>,
    ) -> Self {
        Self {
            payload,
            redelivery_count,
            acknowledger,
        }
    }

    /// Message body.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Number of times this message was delivered before this delivery.
    #[must_use]
    pub fn redelivery_count(&self) -> u32 {
        self.redelivery_count
    }

    /// Acknowledges the delivery.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BrokerUnavailable` if the broker rejects or
    /// cannot receive the acknowledgement.
    pub async fn ack(self) -> Result<(), PipelineError> {
        self.acknowledger.ack().await
    }

    /// Negatively acknowledges the delivery.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BrokerUnavailable` if the broker rejects or
    /// cannot receive the rejection.
    pub async fn nack(self, requeue: bool) -> Result<(), PipelineError> {
        self.acknowledger.nack(requeue).await
    }
}

/// A durable message queue.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Declares a durable, non-exclusive, non-auto-deleted queue. Declaring
    /// an existing queue is a no-op.
    async fn declare_queue(&self, queue: &str) -> Result<(), PipelineError>;

    /// Enqueues one message.
    async fn publish(
        &self,
        queue: &str,
        content_type: &str,
        payload: &[u8],
    ) -> Result<(), PipelineError>;

    /// Opens a manual-acknowledgement subscription to `queue`.
    async fn consume(&self, queue: &str) -> Result<DeliveryStream, PipelineError>;
}
