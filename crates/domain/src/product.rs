//! Catalog products.

use common::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Largest stock quantity a product may be created with.
///
/// Matches the 32-bit signed `quantity` column of the durable store.
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

/// A stored catalog product.
///
/// `quantity` never drops below zero: the only code path that lowers it is
/// the store's conditional decrement, which refuses to touch a product
/// already at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

/// Unvalidated input for creating a product.
///
/// `quantity` is kept wide so that negative or oversized requests reach
/// [`NewProduct::validate`] instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub quantity: i64,
}

impl NewProduct {
    /// Creates a new product input.
    pub fn new(name: impl Into<String>, price: Decimal, quantity: i64) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
        }
    }

    /// Checks the catalog constraints: non-blank name, non-negative price,
    /// quantity within `0..=MAX_QUANTITY`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.price < Decimal::ZERO {
            return Err(ValidationError::NegativePrice { price: self.price });
        }
        if !(0..=MAX_QUANTITY).contains(&self.quantity) {
            return Err(ValidationError::QuantityOutOfRange {
                quantity: self.quantity,
                max: MAX_QUANTITY,
            });
        }
        Ok(())
    }

    /// Validates the input and assigns it a fresh identifier.
    pub fn into_product(self) -> Result<Product, ValidationError> {
        self.validate()?;
        let quantity = u32::try_from(self.quantity).map_err(|_| {
            ValidationError::QuantityOutOfRange {
                quantity: self.quantity,
                max: MAX_QUANTITY,
            }
        })?;

        Ok(Product {
            id: ProductId::new(),
            name: self.name,
            price: self.price,
            quantity,
        })
    }
}
