use thiserror::Error;

/// Errors that can occur when talking to the message bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// The broker cannot be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A message could not be published.
    #[error("Publish error: {0}")]
    Publish(String),

    /// A receive or acknowledge call named a queue nobody declared.
    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    /// An acknowledge named a delivery that is not outstanding.
    #[error("Unknown delivery tag {tag} on queue {queue}")]
    UnknownDeliveryTag { queue: String, tag: String },

    /// The requested topology cannot be expressed by this backend.
    #[error("Topology error: {0}")]
    Topology(String),

    /// The broker rejected a command.
    #[error("Broker error: {0}")]
    Broker(String),
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
