use bus::BusError;
use common::ProductId;
use domain::ValidationError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The input failed validation; nothing was written.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No product with this id.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The write succeeded but its event could not be published.
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for catalog results.
pub type Result<T> = std::result::Result<T, CatalogError>;
