//! Exchange, queue and binding layout.

/// Binds a queue to every routing key matching `pattern`.
///
/// Patterns follow topic-exchange rules: words are separated by `.`, `*`
/// matches exactly one word and `#` matches zero or more words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub queue: String,
    pub pattern: String,
}

impl Binding {
    pub fn new(queue: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            pattern: pattern.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub exchange: String,
    pub bindings: Vec<Binding>,
}

impl Topology {
    pub const EXCHANGE: &'static str = "events";
    pub const PRODUCT_CREATED_QUEUE: &'static str = "product.created";
    pub const ORDER_CREATED_QUEUE: &'static str = "order.created";

    /// The `events` exchange with one durable queue per event type, each
    /// bound by its own name.
    pub fn events() -> Self {
        Self {
            exchange: Self::EXCHANGE.to_string(),
            bindings: vec![
                Binding::new(Self::PRODUCT_CREATED_QUEUE, Self::PRODUCT_CREATED_QUEUE),
                Binding::new(Self::ORDER_CREATED_QUEUE, Self::ORDER_CREATED_QUEUE),
            ],
        }
    }

    /// Queues a message published under `routing_key` lands in.
    pub fn queues_for<'a>(&'a self, routing_key: &'a str) -> impl Iterator<Item = &'a str> {
        self.bindings
            .iter()
            .filter(move |b| routing_key_matches(&b.pattern, routing_key))
            .map(|b| b.queue.as_str())
    }
}

/// Whether `routing_key` matches the topic `pattern`.
pub fn routing_key_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches_words(&pattern, &key)
}

fn matches_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| matches_words(rest, &key[skip..])),
        Some((&word, rest)) => match key.split_first() {
            Some((&k, key_rest)) if word == "*" || word == k => matches_words(rest, key_rest),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pattern() {
        assert!(routing_key_matches("order.created", "order.created"));
        assert!(!routing_key_matches("order.created", "product.created"));
        assert!(!routing_key_matches("order.created", "order.created.v2"));
    }

    #[test]
    fn star_matches_one_word() {
        assert!(routing_key_matches("*.created", "order.created"));
        assert!(routing_key_matches("order.*", "order.shipped"));
        assert!(!routing_key_matches("*.created", "created"));
        assert!(!routing_key_matches("*.created", "a.b.created"));
    }

    #[test]
    fn hash_matches_any_number_of_words() {
        assert!(routing_key_matches("#", "order.created"));
        assert!(routing_key_matches("order.#", "order"));
        assert!(routing_key_matches("order.#", "order.created.v2"));
        assert!(routing_key_matches("#.created", "created"));
        assert!(routing_key_matches("a.#.z", "a.b.c.z"));
        assert!(!routing_key_matches("a.#.z", "a.b.c"));
    }

    #[test]
    fn events_topology_routes_each_type_to_its_queue() {
        let topology = Topology::events();
        assert_eq!(topology.exchange, "events");
        assert_eq!(
            topology.queues_for("order.created").collect::<Vec<_>>(),
            vec!["order.created"]
        );
        assert_eq!(
            topology.queues_for("product.created").collect::<Vec<_>>(),
            vec!["product.created"]
        );
        assert_eq!(topology.queues_for("order.deleted").count(), 0);
    }
}
