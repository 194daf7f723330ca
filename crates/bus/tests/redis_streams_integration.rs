//! Redis Streams bus integration tests
//!
//! Run with:
//!
//! ```bash
//! cargo test -p bus --features redis --test redis_streams_integration
//! ```

use std::time::Duration;

use bus::{Binding, BusError, MessageBus, RedisStreamsBus, Topology};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;

async fn start() -> (ContainerAsync<Redis>, String) {
    let container = Redis::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(6379).await.unwrap();
    (container, format!("redis://{}:{}", host, port))
}

async fn declared(url: &str) -> RedisStreamsBus {
    let bus = RedisStreamsBus::connect(url).await.unwrap();
    bus.declare(&Topology::events()).await.unwrap();
    bus
}

#[tokio::test]
async fn publish_receive_ack() {
    let (_container, url) = start().await;
    let bus = declared(&url).await;

    bus.publish("order.created", b"{\"qty\":1}".to_vec())
        .await
        .unwrap();

    let delivery = tokio::time::timeout(
        Duration::from_secs(5),
        bus.receive("order.created", "worker-1"),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(delivery.routing_key, "order.created");
    assert_eq!(delivery.payload, b"{\"qty\":1}");
    assert!(!delivery.redelivered);

    bus.ack(&delivery).await.unwrap();
    assert!(matches!(
        bus.ack(&delivery).await,
        Err(BusError::UnknownDeliveryTag { .. })
    ));
}

#[tokio::test]
async fn declare_is_idempotent() {
    let (_container, url) = start().await;
    let bus = declared(&url).await;
    bus.declare(&Topology::events()).await.unwrap();
}

#[tokio::test]
async fn restarted_consumer_gets_pending_entries_first() {
    let (_container, url) = start().await;
    let first = declared(&url).await;

    first
        .publish("order.created", b"crashed".to_vec())
        .await
        .unwrap();
    let unacked = first.receive("order.created", "worker-1").await.unwrap();
    drop(first);

    let second = declared(&url).await;
    second
        .publish("order.created", b"fresh".to_vec())
        .await
        .unwrap();

    let again = second.receive("order.created", "worker-1").await.unwrap();
    assert_eq!(again.payload, b"crashed");
    assert_eq!(again.tag, unacked.tag);
    assert!(again.redelivered);
    second.ack(&again).await.unwrap();

    let next = second.receive("order.created", "worker-1").await.unwrap();
    assert_eq!(next.payload, b"fresh");
    assert!(!next.redelivered);
}

#[tokio::test]
async fn wildcard_bindings_are_rejected() {
    let (_container, url) = start().await;
    let bus = RedisStreamsBus::connect(&url).await.unwrap();
    let topology = Topology {
        exchange: "events".to_string(),
        bindings: vec![Binding::new("audit", "#.created")],
    };

    assert!(matches!(
        bus.declare(&topology).await,
        Err(BusError::Topology(_))
    ));
}
