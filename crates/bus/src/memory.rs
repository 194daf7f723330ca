//! In-process topic exchange.
//!
//! Models the broker closely enough to exercise at-least-once behavior:
//! received messages stay unacknowledged until [`MessageBus::ack`], and
//! [`InMemoryBus::recover`] puts every unacknowledged message back at the
//! head of its queue flagged as redelivered, the way a broker does when a
//! consumer's channel closes.
//!
//! Queues are unbounded and never expire messages. A queue with no consumer,
//! such as `product.created` in the default binary, keeps every message it
//! is routed for the life of the process.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::{Binding, BusError, Delivery, DeliveryTag, MessageBus, Result, Topology};

#[derive(Debug, Clone)]
struct Message {
    routing_key: String,
    payload: Vec<u8>,
    redelivered: bool,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Message>,
    unacked: BTreeMap<u64, Message>,
    notify: Arc<Notify>,
}

#[derive(Default)]
struct BusState {
    bindings: Vec<Binding>,
    queues: HashMap<String, QueueState>,
}

/// In-memory message bus for tests and single-process runs.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    state: Arc<Mutex<BusState>>,
    next_tag: Arc<AtomicU64>,
    fail_publish: Arc<AtomicBool>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent publish fail.
    pub fn set_publish_failure(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Requeues every unacknowledged message at the head of its queue,
    /// marked as redelivered.
    ///
    /// Returns the number of messages requeued.
    pub async fn recover(&self) -> usize {
        let mut state = self.state.lock().await;
        let mut requeued = 0;
        for queue in state.queues.values_mut() {
            let unacked = std::mem::take(&mut queue.unacked);
            for (_, mut message) in unacked.into_iter().rev() {
                message.redelivered = true;
                queue.ready.push_front(message);
                requeued += 1;
            }
            if !queue.ready.is_empty() {
                queue.notify.notify_one();
            }
        }
        tracing::debug!(requeued, "recovered unacknowledged messages");
        requeued
    }

    /// Messages waiting on `queue` to be received.
    pub async fn ready_count(&self, queue: &str) -> usize {
        let state = self.state.lock().await;
        state.queues.get(queue).map_or(0, |q| q.ready.len())
    }

    /// Messages received from `queue` and not yet acknowledged.
    pub async fn unacked_count(&self, queue: &str) -> usize {
        let state = self.state.lock().await;
        state.queues.get(queue).map_or(0, |q| q.unacked.len())
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn declare(&self, topology: &Topology) -> Result<()> {
        let mut state = self.state.lock().await;
        for binding in &topology.bindings {
            state.queues.entry(binding.queue.clone()).or_default();
            if !state.bindings.contains(binding) {
                state.bindings.push(binding.clone());
            }
        }
        Ok(())
    }

    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(BusError::Publish("in-memory bus set to fail".to_string()));
        }

        let mut state = self.state.lock().await;
        let BusState { bindings, queues } = &mut *state;

        let mut routed = 0;
        for binding in bindings.iter() {
            if !crate::routing_key_matches(&binding.pattern, routing_key) {
                continue;
            }
            if let Some(queue) = queues.get_mut(&binding.queue) {
                queue.ready.push_back(Message {
                    routing_key: routing_key.to_string(),
                    payload: payload.clone(),
                    redelivered: false,
                });
                queue.notify.notify_one();
                routed += 1;
            }
        }

        if routed == 0 {
            tracing::debug!(routing_key, "message matched no binding, dropped");
        }
        Ok(())
    }

    async fn receive(&self, queue: &str, consumer: &str) -> Result<Delivery> {
        loop {
            let notify = {
                let mut state = self.state.lock().await;
                let q = state
                    .queues
                    .get_mut(queue)
                    .ok_or_else(|| BusError::UnknownQueue(queue.to_string()))?;

                if let Some(message) = q.ready.pop_front() {
                    let tag = self.next_tag.fetch_add(1, Ordering::SeqCst) + 1;
                    q.unacked.insert(tag, message.clone());
                    // Hand the wakeup on so a second waiter sees what is left.
                    if !q.ready.is_empty() {
                        q.notify.notify_one();
                    }
                    tracing::trace!(queue, consumer, tag, "message delivered");
                    return Ok(Delivery {
                        tag: DeliveryTag(tag.to_string()),
                        queue: queue.to_string(),
                        routing_key: message.routing_key,
                        payload: message.payload,
                        redelivered: message.redelivered,
                    });
                }
                q.notify.clone()
            };
            notify.notified().await;
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        let unknown = || BusError::UnknownDeliveryTag {
            queue: delivery.queue.clone(),
            tag: delivery.tag.to_string(),
        };
        let tag: u64 = delivery.tag.0.parse().map_err(|_| unknown())?;

        let mut state = self.state.lock().await;
        let queue = state
            .queues
            .get_mut(&delivery.queue)
            .ok_or_else(|| BusError::UnknownQueue(delivery.queue.clone()))?;
        queue.unacked.remove(&tag).map(|_| ()).ok_or_else(unknown)
    }
}
