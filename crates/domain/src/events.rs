//! Events published on the message bus.
//!
//! On the wire an event is its type, used as the routing key, plus a JSON
//! payload. Consumers decode through [`DomainEvent::decode`], which rejects
//! unknown types and payloads that do not match the schema for their type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{OrderPlaced, Product};

/// Every event this system publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DomainEvent {
    /// A product was written to the catalog. Carries the stored record.
    #[serde(rename = "product.created")]
    ProductCreated(Product),

    /// An order was recorded.
    #[serde(rename = "order.created")]
    OrderCreated(OrderPlaced),
}

impl DomainEvent {
    pub const PRODUCT_CREATED: &'static str = "product.created";
    pub const ORDER_CREATED: &'static str = "order.created";

    /// Returns the event type, which is also its routing key.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::ProductCreated(_) => Self::PRODUCT_CREATED,
            DomainEvent::OrderCreated(_) => Self::ORDER_CREATED,
        }
    }

    /// Serializes the payload alone, without the type tag.
    pub fn encode_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            DomainEvent::ProductCreated(product) => serde_json::to_vec(product),
            DomainEvent::OrderCreated(placed) => serde_json::to_vec(placed),
        }
    }

    /// Decodes a payload received under `event_type`.
    pub fn decode(event_type: &str, payload: &[u8]) -> Result<Self, EventDecodeError> {
        match event_type {
            Self::PRODUCT_CREATED => serde_json::from_slice(payload)
                .map(DomainEvent::ProductCreated)
                .map_err(|source| EventDecodeError::Malformed {
                    event_type: Self::PRODUCT_CREATED,
                    source,
                }),
            Self::ORDER_CREATED => serde_json::from_slice(payload)
                .map(DomainEvent::OrderCreated)
                .map_err(|source| EventDecodeError::Malformed {
                    event_type: Self::ORDER_CREATED,
                    source,
                }),
            other => Err(EventDecodeError::UnknownType(other.to_string())),
        }
    }
}

impl From<Product> for DomainEvent {
    fn from(product: Product) -> Self {
        DomainEvent::ProductCreated(product)
    }
}

impl From<OrderPlaced> for DomainEvent {
    fn from(placed: OrderPlaced) -> Self {
        DomainEvent::OrderCreated(placed)
    }
}

/// A bus payload that could not be turned into a [`DomainEvent`].
#[derive(Debug, Error)]
pub enum EventDecodeError {
    /// The routing key names no known event.
    #[error("Unknown event type: {0}")]
    UnknownType(String),

    /// The payload does not match the schema for its event type.
    #[error("Malformed {event_type} payload: {source}")]
    Malformed {
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
