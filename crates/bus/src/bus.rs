use async_trait::async_trait;

use crate::{Delivery, Result, Topology};

/// Topic message bus with explicit per-message acknowledgement.
///
/// Delivery is at-least-once: a message stays owned by the broker until
/// [`ack`](MessageBus::ack) succeeds, and an unacknowledged message is handed
/// out again after the consumer goes away. Consumers must tolerate
/// duplicates.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Declares the exchange, queues and bindings. Idempotent.
    async fn declare(&self, topology: &Topology) -> Result<()>;

    /// Publishes `payload` under `routing_key`.
    ///
    /// A message whose key matches no binding is dropped.
    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<()>;

    /// Waits for the next message on `queue` on behalf of `consumer`.
    ///
    /// Dropping the future before it resolves never loses a message, though a
    /// backend may hold it back until the consumer reconnects.
    async fn receive(&self, queue: &str, consumer: &str) -> Result<Delivery>;

    /// Acknowledges a delivery, removing the message from its queue for good.
    async fn ack(&self, delivery: &Delivery) -> Result<()>;
}
