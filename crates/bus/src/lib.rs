//! Message bus with at-least-once delivery and explicit acknowledgement.
//!
//! Publishers send a payload under a routing key to the `events` topic
//! exchange. Durable queues bound by routing-key patterns hold each message
//! until a consumer acknowledges it; anything received but never acknowledged
//! is delivered again.

pub mod bus;
pub mod delivery;
pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_streams;
pub mod retry;
pub mod topology;

pub use bus::MessageBus;
pub use delivery::{Delivery, DeliveryTag};
pub use error::{BusError, Result};
pub use memory::InMemoryBus;
#[cfg(feature = "redis")]
pub use redis_streams::RedisStreamsBus;
pub use retry::{RetryPolicy, connect_with_retry};
pub use topology::{Binding, Topology, routing_key_matches};
