use std::fmt;

/// Broker-assigned handle identifying one delivery of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeliveryTag(pub String);

impl fmt::Display for DeliveryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message handed to a consumer, outstanding until acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub queue: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
    /// Set when this message was handed out before and never acknowledged.
    pub redelivered: bool,
}
