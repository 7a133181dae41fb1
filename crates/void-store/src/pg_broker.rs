//! `PostgreSQL` implementation of the `Broker` trait.
//!
//! Queues live in two tables: `queues` names the declared queues and
//! `queue_messages` holds their messages. A consumer claims the visible
//! message with the lowest `seq` using `FOR UPDATE SKIP LOCKED` and leases
//! it until `locked_until`. While the lease holds no other consumer sees the message;
//! once it expires the message is visible again, which is how messages
//! orphaned by a lost consumer get redelivered. `nack(true)` draws a new
//! `seq`, so a requeued message waits behind everything already queued.
//!
//! Every claim bumps `delivery_count`, and acknowledgement handles carry the
//! count they were claimed with. A handle whose lease was lost and re-claimed
//! elsewhere therefore fails to resolve instead of touching the new claim.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use void_core::broker::{Acknowledger, Broker, Delivery, DeliveryStream};
use void_core::error::PipelineError;

use crate::unavailable;

/// Default pause between polls of an empty queue.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default time a claimed message stays invisible to other consumers.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(30);

const CLAIM_MESSAGE: &str = r"
UPDATE queue_messages
SET locked_until = NOW() + make_interval(secs => $2),
    delivery_count = delivery_count + 1
WHERE id = (
    SELECT id FROM queue_messages
    WHERE queue = $1
      AND (locked_until IS NULL OR locked_until <= NOW())
    ORDER BY seq
    LIMIT 1
    FOR UPDATE SKIP LOCKED
)
RETURNING id, payload, delivery_count
";

const REQUEUE_MESSAGE: &str = r"
UPDATE queue_messages
SET locked_until = NULL,
    seq = nextval('queue_message_seq')
WHERE id = $1 AND delivery_count = $2
";

const DEAD_LETTER_MESSAGE: &str = r"
WITH moved AS (
    DELETE FROM queue_messages
    WHERE id = $1 AND delivery_count = $2
    RETURNING queue, content_type, payload, delivery_count, enqueued_at
)
INSERT INTO dead_letters (queue, content_type, payload, delivery_count, enqueued_at)
SELECT queue, content_type, payload, delivery_count, enqueued_at FROM moved
";

/// PostgreSQL-backed durable queue broker.
#[derive(Debug, Clone)]
pub struct PgBroker {
    pool: PgPool,
    poll_interval: Duration,
    lease: Duration,
}

impl PgBroker {
    /// Creates a broker with the default poll interval and lease.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            poll_interval: DEFAULT_POLL_INTERVAL,
            lease: DEFAULT_LEASE,
        }
    }

    /// Sets how long a subscription sleeps when its queue is empty.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets how long a claimed message stays leased to its consumer.
    #[must_use]
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }
}

#[async_trait]
impl Broker for PgBroker {
    #[instrument(skip(self))]
    async fn declare_queue(&self, queue: &str) -> Result<(), PipelineError> {
        sqlx::query("INSERT INTO queues (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(queue)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    async fn publish(
        &self,
        queue: &str,
        content_type: &str,
        payload: &[u8],
    ) -> Result<(), PipelineError> {
        sqlx::query(
            "INSERT INTO queue_messages (queue, content_type, payload) VALUES ($1, $2, $3)",
        )
        .bind(queue)
        .bind(content_type)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn consume(&self, queue: &str) -> Result<DeliveryStream, PipelineError> {
        let declared = sqlx::query("SELECT 1 FROM queues WHERE name = $1")
            .bind(queue)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        if declared.is_none() {
            return Err(PipelineError::BrokerUnavailable(format!(
                "queue {queue} not declared"
            )));
        }

        let subscription = Subscription {
            pool: self.pool.clone(),
            queue: queue.to_owned(),
            poll_interval: self.poll_interval,
            lease: self.lease,
            closed: false,
        };
        let deliveries = stream::unfold(subscription, |mut sub| async move {
            if sub.closed {
                return None;
            }
            loop {
                match sub.claim().await {
                    Ok(Some(delivery)) => return Some((Ok(delivery), sub)),
                    Ok(None) => tokio::time::sleep(sub.poll_interval).await,
                    Err(err) => {
                        warn!(queue = %sub.queue, error = %err, "closing subscription");
                        sub.closed = true;
                        return Some((Err(err), sub));
                    }
                }
            }
        });

        Ok(Box::pin(deliveries))
    }
}

struct Subscription {
    pool: PgPool,
    queue: String,
    poll_interval: Duration,
    lease: Duration,
    closed: bool,
}

impl Subscription {
    async fn claim(&self) -> Result<Option<Delivery>, PipelineError> {
        let row: Option<(i64, Vec<u8>, i32)> = sqlx::query_as(CLAIM_MESSAGE)
            .bind(&self.queue)
            .bind(self.lease.as_secs_f64())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(row.map(|(id, payload, delivery_count)| {
            debug!(queue = %self.queue, message_id = id, delivery_count, "claimed message");
            let redelivery_count = u32::try_from(delivery_count.saturating_sub(1)).unwrap_or(0);
            Delivery::new(
                payload,
                redelivery_count,
                Box::new(PgAcknowledger {
                    pool: self.pool.clone(),
                    message_id: id,
                    delivery_count,
                }),
            )
        }))
    }
}

#[derive(Debug)]
struct PgAcknowledger {
    pool: PgPool,
    message_id: i64,
    delivery_count: i32,
}

impl PgAcknowledger {
    async fn resolve(&self, sql: &str) -> Result<(), PipelineError> {
        let result = sqlx::query(sql)
            .bind(self.message_id)
            .bind(self.delivery_count)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::BrokerUnavailable(format!(
                "lease on message {} was lost",
                self.message_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Acknowledger for PgAcknowledger {
    async fn ack(&self) -> Result<(), PipelineError> {
        self.resolve("DELETE FROM queue_messages WHERE id = $1 AND delivery_count = $2")
            .await
    }

    async fn nack(&self, requeue: bool) -> Result<(), PipelineError> {
        if requeue {
            self.resolve(REQUEUE_MESSAGE).await
        } else {
            self.resolve(DEAD_LETTER_MESSAGE).await
        }
    }
}
