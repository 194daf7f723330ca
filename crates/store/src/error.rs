use thiserror::Error;

/// Errors that can occur when interacting with the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A record with the same key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A stored row could not be mapped back to a domain record.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// The store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
