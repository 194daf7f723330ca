//! Recorded orders and the payload announcing them.

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Lifecycle status of an order. Orders are immutable once recorded, so
/// every order stays `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
        }
    }
}

/// Checks that an ordered quantity is a positive 32-bit count.
pub fn validate_order_qty(qty: i64) -> Result<NonZeroU32, ValidationError> {
    u32::try_from(qty)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(ValidationError::OrderQuantityOutOfRange {
            qty,
            max: u32::MAX as i64,
        })
}

/// A recorded order.
///
/// `product_id` is a weak reference: the product row is neither owned nor
/// locked by the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    pub qty: NonZeroU32,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds a pending order for `qty` units priced at `unit_price`.
    pub fn place(product_id: ProductId, unit_price: Decimal, qty: NonZeroU32) -> Self {
        Self {
            id: OrderId::new(),
            product_id,
            qty,
            total_price: unit_price * Decimal::from(qty.get()),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Returns the `order.created` payload for this order.
    pub fn placed_event(&self) -> OrderPlaced {
        OrderPlaced {
            order_id: Some(self.id),
            product_id: self.product_id,
            qty: self.qty,
        }
    }
}

/// Payload of an `order.created` event.
///
/// `order_id` is optional on the wire so that bare `{productId, qty}`
/// payloads still decode; without it the event cannot be deduplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    pub product_id: ProductId,
    pub qty: NonZeroU32,
}

impl OrderPlaced {
    /// Creates a payload without an order id.
    pub fn anonymous(product_id: ProductId, qty: NonZeroU32) -> Self {
        Self {
            order_id: None,
            product_id,
            qty,
        }
    }
}
