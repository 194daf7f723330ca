//! Domain error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Input rejected before any write takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Product name is blank.
    #[error("Product name must not be empty")]
    EmptyName,

    /// Product price is below zero.
    #[error("Invalid price: {price} (must be zero or greater)")]
    NegativePrice { price: Decimal },

    /// Stock quantity does not fit the stored column.
    #[error("Invalid quantity: {quantity} (must be between 0 and {max})")]
    QuantityOutOfRange { quantity: i64, max: i64 },

    /// Ordered quantity is zero, negative or too large.
    #[error("Invalid order quantity: {qty} (must be between 1 and {max})")]
    OrderQuantityOutOfRange { qty: i64, max: i64 },
}
