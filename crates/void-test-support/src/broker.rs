//! Test brokers — in-process `Broker` implementations for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use tokio::sync::watch;
use void_core::broker::{Acknowledger, Broker, Delivery, DeliveryStream};
use void_core::error::PipelineError;

/// An in-memory durable queue with manual acknowledgement.
///
/// Messages move from *ready* to *in flight* when delivered, and leave the
/// queue only on `ack`. `nack(true)` puts a message at the tail of the
/// queue; [`InMemoryBroker::drop_connection`] puts orphaned in-flight
/// messages back at the head. Both bump the redelivery count.
///
/// Clones share the same queues.
#[derive(Debug, Clone)]
pub struct InMemoryBroker {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    changed: watch::Sender<u64>,
}

#[derive(Debug, Default)]
struct State {
    queues: HashMap<String, QueueState>,
    next_tag: u64,
    generation: u64,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Message>,
    in_flight: HashMap<u64, Message>,
    published: Vec<(String, Vec<u8>)>,
    acked: usize,
    dead_letters: Vec<Vec<u8>>,
}

#[derive(Debug, Clone)]
struct Message {
    payload: Vec<u8>,
    redelivery_count: u32,
}

enum Poll {
    Closed,
    Empty,
    Ready(u64, Message),
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Creates a broker with no queues declared.
    #[must_use]
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                changed,
            }),
        }
    }

    /// Ends every open subscription, as a broker disconnect would. In-flight
    /// messages stay in flight and can still be resolved.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn close_subscriptions(&self) {
        self.inner.state.lock().unwrap().generation += 1;
        self.inner.notify();
    }

    /// Simulates the consumer connection dropping: every in-flight message
    /// returns to the head of its queue for redelivery and every open
    /// subscription ends. Handles from the lost connection can no longer be
    /// resolved.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn drop_connection(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.generation += 1;
            for queue in state.queues.values_mut() {
                let mut orphaned: Vec<(u64, Message)> = queue.in_flight.drain().collect();
                orphaned.sort_by_key(|(tag, _)| *tag);
                for (_, mut message) in orphaned.into_iter().rev() {
                    message.redelivery_count += 1;
                    queue.ready.push_front(message);
                }
            }
        }
        self.inner.notify();
    }

    /// Every `(content_type, payload)` published to `queue`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published(&self, queue: &str) -> Vec<(String, Vec<u8>)> {
        self.with_queue(queue, |q| q.published.clone())
    }

    /// Messages waiting to be delivered.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn ready_count(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.ready.len())
    }

    /// Messages delivered but not yet acknowledged or rejected.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn in_flight_count(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.in_flight.len())
    }

    /// Messages removed by `ack`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn acked_count(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.acked)
    }

    /// Payloads rejected with `nack(false)`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn dead_letters(&self, queue: &str) -> Vec<Vec<u8>> {
        self.with_queue(queue, |q| q.dead_letters.clone())
    }

    fn with_queue<T: Default>(&self, queue: &str, f: impl FnOnce(&QueueState) -> T) -> T {
        self.inner
            .state
            .lock()
            .unwrap()
            .queues
            .get(queue)
            .map(f)
            .unwrap_or_default()
    }
}

impl Inner {
    fn notify(&self) {
        self.changed.send_modify(|version| *version += 1);
    }

    fn poll(&self, queue: &str, generation: u64) -> Poll {
        let mut state = self.state.lock().unwrap();
        if state.generation != generation {
            return Poll::Closed;
        }
        let tag = state.next_tag;
        let Some(queue) = state.queues.get_mut(queue) else {
            return Poll::Closed;
        };
        let Some(message) = queue.ready.pop_front() else {
            return Poll::Empty;
        };
        queue.in_flight.insert(tag, message.clone());
        state.next_tag += 1;
        Poll::Ready(tag, message)
    }

    fn resolve(&self, queue: &str, tag: u64, requeue: Option<bool>) -> Result<(), PipelineError> {
        {
            let mut state = self.state.lock().unwrap();
            let queue = state.queues.get_mut(queue).ok_or_else(|| {
                PipelineError::BrokerUnavailable(format!("queue {queue} not declared"))
            })?;
            let mut message = queue.in_flight.remove(&tag).ok_or_else(|| {
                PipelineError::BrokerUnavailable(format!("delivery tag {tag} is not in flight"))
            })?;
            match requeue {
                None => queue.acked += 1,
                Some(true) => {
                    message.redelivery_count += 1;
                    queue.ready.push_back(message);
                }
                Some(false) => queue.dead_letters.push(message.payload),
            }
        }
        self.notify();
        Ok(())
    }
}

#[derive(Debug)]
struct InMemoryAcknowledger {
    inner: Arc<Inner>,
    queue: String,
    tag: u64,
}

#[async_trait]
impl Acknowledger for InMemoryAcknowledger {
    async fn ack(&self) -> Result<(), PipelineError> {
        self.inner.resolve(&self.queue, self.tag, None)
    }

    async fn nack(&self, requeue: bool) -> Result<(), PipelineError> {
        self.inner.resolve(&self.queue, self.tag, Some(requeue))
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn declare_queue(&self, queue: &str) -> Result<(), PipelineError> {
        self.inner
            .state
            .lock()
            .unwrap()
            .queues
            .entry(queue.to_owned())
            .or_default();
        Ok(())
    }

    async fn publish(
        &self,
        queue: &str,
        content_type: &str,
        payload: &[u8],
    ) -> Result<(), PipelineError> {
        {
            let mut state = self.inner.state.lock().unwrap();
            let queue = state.queues.get_mut(queue).ok_or_else(|| {
                PipelineError::BrokerUnavailable(format!("queue {queue} not declared"))
            })?;
            queue
                .published
                .push((content_type.to_owned(), payload.to_vec()));
            queue.ready.push_back(Message {
                payload: payload.to_vec(),
                redelivery_count: 0,
            });
        }
        self.inner.notify();
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, PipelineError> {
        let generation = {
            let state = self.inner.state.lock().unwrap();
            if !state.queues.contains_key(queue) {
                return Err(PipelineError::BrokerUnavailable(format!(
                    "queue {queue} not declared"
                )));
            }
            state.generation
        };

        let seed = (
            self.inner.clone(),
            queue.to_owned(),
            self.inner.changed.subscribe(),
        );
        let deliveries = stream::unfold(seed, move |(inner, queue, mut changed)| async move {
            // Let other tasks run between deliveries of a requeue cycle.
            tokio::task::yield_now().await;
            loop {
                changed.borrow_and_update();
                match inner.poll(&queue, generation) {
                    Poll::Closed => return None,
                    Poll::Ready(tag, message) => {
                        let delivery = Delivery::new(
                            message.payload,
                            message.redelivery_count,
                            Box::new(InMemoryAcknowledger {
                                inner: inner.clone(),
                                queue: queue.clone(),
                                tag,
                            }),
                        );
                        return Some((Ok::<_, PipelineError>(delivery), (inner, queue, changed)));
                    }
                    Poll::Empty => {
                        if changed.changed().await.is_err() {
                            return None;
                        }
                    }
                }
            }
        });

        Ok(Box::pin(deliveries))
    }
}

/// A broker whose every operation fails with `BrokerUnavailable`. Useful for
/// testing that publish failures stay invisible to the write path.
#[derive(Debug)]
pub struct FailingBroker;

#[async_trait]
impl Broker for FailingBroker {
    async fn declare_queue(&self, _queue: &str) -> Result<(), PipelineError> {
        Err(PipelineError::BrokerUnavailable("connection refused".into()))
    }

    async fn publish(
        &self,
        _queue: &str,
        _content_type: &str,
        _payload: &[u8],
    ) -> Result<(), PipelineError> {
        Err(PipelineError::BrokerUnavailable("connection refused".into()))
    }

    async fn consume(&self, _queue: &str) -> Result<DeliveryStream, PipelineError> {
        Err(PipelineError::BrokerUnavailable("connection refused".into()))
    }
}
