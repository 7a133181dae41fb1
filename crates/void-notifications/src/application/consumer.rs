//! Background consumer of the shout notification queue.
//!
//! Each delivery is decoded and fanned out, then acknowledged. A payload that
//! does not decode is rejected with requeue, so the broker will hand it out
//! again; set [`ConsumerConfig::max_redeliveries`] to drop such messages
//! after a bounded number of attempts instead.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, instrument, warn};
use void_core::broker::{Broker, Delivery, SHOUT_NOTIFICATIONS_QUEUE};
use void_core::error::PipelineError;
use void_core::event::DomainEvent;

use super::backoff::ReconnectPolicy;
use super::fan_out::{FanOutHandler, FanOutOutcome};
use crate::domain::events::ShoutCreated;

/// Consumer tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Redeliveries a malformed message gets before it is rejected without
    /// requeue. `None` requeues forever.
    pub max_redeliveries: Option<u32>,
}

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Decoded and fanned out, then acknowledged.
    Acknowledged(FanOutOutcome),
    /// Malformed; rejected with requeue.
    Requeued,
    /// Malformed past the redelivery limit; rejected without requeue.
    DeadLettered,
}

/// Pulls `ShoutCreated` deliveries off the broker and fans them out, one
/// delivery at a time.
#[derive(Clone)]
pub struct ConsumerLoop {
    broker: Arc<dyn Broker>,
    handler: FanOutHandler,
    config: ConsumerConfig,
}

impl ConsumerLoop {
    /// Creates a consumer. Nothing happens until [`ConsumerLoop::run`] or
    /// [`ConsumerLoop::run_forever`] is awaited.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, handler: FanOutHandler, config: ConsumerConfig) -> Self {
        Self {
            broker,
            handler,
            config,
        }
    }

    /// Declares the queue, subscribes, and handles deliveries until the
    /// broker ends the subscription. Returns how many deliveries were
    /// handled.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BrokerUnavailable` if declaring, subscribing,
    /// receiving, or resolving a delivery fails.
    pub async fn run(&self) -> Result<u64, PipelineError> {
        let mut handled = 0;
        self.subscribe_once(&mut handled).await?;
        Ok(handled)
    }

    /// Runs [`ConsumerLoop::run`] in a loop, resubscribing after each
    /// subscription ends with a delay drawn from `policy`. The delay resets
    /// whenever a subscription handled at least one delivery.
    ///
    /// Only returns once `policy.max_attempts` consecutive attempts have
    /// failed, yielding the last error.
    pub async fn run_forever(&self, policy: &ReconnectPolicy) -> PipelineError {
        let mut backoff = policy.backoff();
        loop {
            let mut handled = 0;
            let err = match self.subscribe_once(&mut handled).await {
                Ok(()) => PipelineError::BrokerUnavailable("subscription closed by broker".into()),
                Err(err) => err,
            };
            if handled > 0 {
                backoff.reset();
            }

            let Some(delay) = backoff.next() else {
                error!(error = %err, attempts = backoff.attempts(), "giving up on notification queue");
                return err;
            };
            warn!(error = %err, handled, ?delay, "notification queue subscription ended; resubscribing");
            tokio::time::sleep(delay).await;
        }
    }

    async fn subscribe_once(&self, handled: &mut u64) -> Result<(), PipelineError> {
        self.broker.declare_queue(SHOUT_NOTIFICATIONS_QUEUE).await?;
        let mut deliveries = self.broker.consume(SHOUT_NOTIFICATIONS_QUEUE).await?;
        info!(queue = SHOUT_NOTIFICATIONS_QUEUE, "consuming shout events");

        while let Some(next) = deliveries.next().await {
            self.process_delivery(next?).await?;
            *handled += 1;
        }

        info!(handled = *handled, "notification queue subscription ended");
        Ok(())
    }

    /// Handles a single delivery and resolves its acknowledgement handle.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BrokerUnavailable` if the ack or nack cannot
    /// be delivered to the broker. Decode and fan-out failures are not
    /// errors here; they are reflected in the outcome.
    #[instrument(skip_all, fields(redelivery_count = delivery.redelivery_count()))]
    pub async fn process_delivery(
        &self,
        delivery: Delivery,
    ) -> Result<DeliveryOutcome, PipelineError> {
        debug!(payload = %String::from_utf8_lossy(delivery.payload()), "received shout event");

        let event = match ShoutCreated::decode(delivery.payload()) {
            Ok(event) => event,
            Err(err) => return self.reject(delivery, &err).await,
        };

        let outcome = self.handler.fan_out(&event).await;
        delivery.ack().await?;
        debug!(shout_id = event.shout_id(), "acknowledged shout event");
        Ok(DeliveryOutcome::Acknowledged(outcome))
    }

    async fn reject(
        &self,
        delivery: Delivery,
        err: &PipelineError,
    ) -> Result<DeliveryOutcome, PipelineError> {
        let exhausted = self
            .config
            .max_redeliveries
            .is_some_and(|max| delivery.redelivery_count() >= max);

        if exhausted {
            error!(error = %err, "dropping malformed shout event after redelivery limit");
            delivery.nack(false).await?;
            Ok(DeliveryOutcome::DeadLettered)
        } else {
            warn!(error = %err, "requeueing malformed shout event");
            delivery.nack(true).await?;
            Ok(DeliveryOutcome::Requeued)
        }
    }
}
