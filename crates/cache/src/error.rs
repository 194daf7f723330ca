use thiserror::Error;

/// Errors that can occur when talking to the cache.
///
/// Callers treat every variant as non-fatal: a failed read is a miss and a
/// failed write or delete is logged and dropped.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend cannot be reached.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected a command.
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A cached value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
