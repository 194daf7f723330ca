use bus::BusError;
use common::ProductId;
use domain::ValidationError;
use store::StoreError;
use thiserror::Error;

use crate::DirectoryError;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order quantity is out of range.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The order references a product that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product could not be looked up.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The order was recorded but its event could not be published.
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for order results.
pub type Result<T> = std::result::Result<T, OrderError>;
