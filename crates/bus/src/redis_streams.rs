//! Redis Streams message bus.
//!
//! Each routing key is a stream named `<exchange>:<routing_key>` and each
//! queue is a consumer group on the streams it is bound to. An entry stays
//! in the group's pending list until XACK, so a consumer that restarts
//! under the same name first re-reads its own pending entries (flagged as
//! redelivered) before taking new ones.
//!
//! Streams cannot be matched by pattern, so bindings must name exact
//! routing keys.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tokio::sync::{Mutex, RwLock};

use crate::{BusError, Delivery, DeliveryTag, MessageBus, Result, Topology};

/// How long a single XREADGROUP blocks before the receive loop re-issues it.
const BLOCK_MS: usize = 1_000;

const PAYLOAD_FIELD: &str = "payload";

impl From<redis::RedisError> for BusError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
            BusError::Connection(e.to_string())
        } else {
            BusError::Broker(e.to_string())
        }
    }
}

#[derive(Default)]
struct ConsumerState {
    pending_drained: bool,
    buffered: VecDeque<Delivery>,
}

#[derive(Clone)]
pub struct RedisStreamsBus {
    client: Client,
    publisher: MultiplexedConnection,
    exchange: Arc<RwLock<String>>,
    // queue -> routing keys bound to it
    bindings: Arc<RwLock<HashMap<String, Vec<String>>>>,
    // blocking reads get a connection of their own per consumer
    consumers: Arc<Mutex<HashMap<String, MultiplexedConnection>>>,
    states: Arc<Mutex<HashMap<(String, String), ConsumerState>>>,
}

impl RedisStreamsBus {
    /// Connects to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let publisher = client.get_multiplexed_async_connection().await?;
        tracing::info!("connected to redis streams bus");
        Ok(Self {
            client,
            publisher,
            exchange: Arc::new(RwLock::new(Topology::EXCHANGE.to_string())),
            bindings: Arc::default(),
            consumers: Arc::default(),
            states: Arc::default(),
        })
    }

    async fn stream_key(&self, routing_key: &str) -> String {
        format!("{}:{}", self.exchange.read().await, routing_key)
    }

    async fn consumer_connection(&self, consumer: &str) -> Result<MultiplexedConnection> {
        let mut consumers = self.consumers.lock().await;
        if let Some(conn) = consumers.get(consumer) {
            return Ok(conn.clone());
        }
        let conn = self.client.get_multiplexed_async_connection().await?;
        consumers.insert(consumer.to_string(), conn.clone());
        Ok(conn)
    }

    async fn bound_keys(&self, queue: &str) -> Result<Vec<String>> {
        self.bindings
            .read()
            .await
            .get(queue)
            .cloned()
            .ok_or_else(|| BusError::UnknownQueue(queue.to_string()))
    }

    /// Turns a read reply into deliveries, acking entries that carry no
    /// payload (trimmed or foreign) so they stop coming back.
    async fn collect(
        &self,
        queue: &str,
        routing_keys: &[String],
        reply: Option<StreamReadReply>,
        redelivered: bool,
    ) -> Result<Vec<Delivery>> {
        let mut deliveries = Vec::new();
        let Some(reply) = reply else {
            return Ok(deliveries);
        };
        let prefix = format!("{}:", self.exchange.read().await);

        for stream in reply.keys {
            let routing_key = stream
                .key
                .strip_prefix(&prefix)
                .filter(|k| routing_keys.iter().any(|r| r == k))
                .ok_or_else(|| BusError::Broker(format!("unexpected stream {}", stream.key)))?
                .to_string();

            for entry in stream.ids {
                match payload_of(&entry) {
                    Some(payload) => deliveries.push(Delivery {
                        tag: DeliveryTag(entry.id),
                        queue: queue.to_string(),
                        routing_key: routing_key.clone(),
                        payload,
                        redelivered,
                    }),
                    None => {
                        tracing::warn!(stream = %stream.key, id = %entry.id, "entry without payload, acking");
                        let mut conn = self.publisher.clone();
                        let _: i64 = conn.xack(&stream.key, queue, &[&entry.id]).await?;
                    }
                }
            }
        }
        Ok(deliveries)
    }
}

fn payload_of(entry: &StreamId) -> Option<Vec<u8>> {
    entry.get::<Vec<u8>>(PAYLOAD_FIELD)
}

#[async_trait]
impl MessageBus for RedisStreamsBus {
    async fn declare(&self, topology: &Topology) -> Result<()> {
        if let Some(binding) = topology
            .bindings
            .iter()
            .find(|b| b.pattern.split('.').any(|w| w == "*" || w == "#"))
        {
            return Err(BusError::Topology(format!(
                "wildcard binding {} -> {} is not supported on redis streams",
                binding.pattern, binding.queue
            )));
        }

        *self.exchange.write().await = topology.exchange.clone();

        let mut conn = self.publisher.clone();
        for binding in &topology.bindings {
            let stream = self.stream_key(&binding.pattern).await;
            let created: redis::RedisResult<()> = conn
                .xgroup_create_mkstream(&stream, &binding.queue, "0")
                .await;
            match created {
                Ok(()) => tracing::info!(%stream, queue = %binding.queue, "consumer group created"),
                Err(e) if e.code() == Some("BUSYGROUP") => {}
                Err(e) => return Err(e.into()),
            }

            let mut bindings = self.bindings.write().await;
            let keys = bindings.entry(binding.queue.clone()).or_default();
            if !keys.contains(&binding.pattern) {
                keys.push(binding.pattern.clone());
            }
        }
        Ok(())
    }

    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<()> {
        let bound = self
            .bindings
            .read()
            .await
            .values()
            .any(|keys| keys.iter().any(|k| k == routing_key));
        if !bound {
            tracing::debug!(routing_key, "message matched no binding, dropped");
            return Ok(());
        }

        let stream = self.stream_key(routing_key).await;
        let mut conn = self.publisher.clone();
        let _: String = conn
            .xadd(&stream, "*", &[(PAYLOAD_FIELD, payload.as_slice())])
            .await
            .map_err(|e| BusError::Publish(e.to_string()))?;
        Ok(())
    }

    async fn receive(&self, queue: &str, consumer: &str) -> Result<Delivery> {
        let routing_keys = self.bound_keys(queue).await?;
        let mut streams = Vec::with_capacity(routing_keys.len());
        for key in &routing_keys {
            streams.push(self.stream_key(key).await);
        }
        let state_key = (queue.to_string(), consumer.to_string());
        let mut conn = self.consumer_connection(consumer).await?;

        loop {
            let pending_drained = {
                let mut states = self.states.lock().await;
                let state = states.entry(state_key.clone()).or_default();
                if let Some(delivery) = state.buffered.pop_front() {
                    return Ok(delivery);
                }
                state.pending_drained
            };

            let (start, options) = if pending_drained {
                (
                    ">",
                    StreamReadOptions::default()
                        .group(queue, consumer)
                        .count(1)
                        .block(BLOCK_MS),
                )
            } else {
                ("0", StreamReadOptions::default().group(queue, consumer).count(1))
            };
            let ids = vec![start; streams.len()];

            let reply: Option<StreamReadReply> =
                conn.xread_options(&streams, &ids, &options).await?;
            let deliveries = self
                .collect(queue, &routing_keys, reply, !pending_drained)
                .await?;

            let mut states = self.states.lock().await;
            let state = states.entry(state_key.clone()).or_default();
            if deliveries.is_empty() && !pending_drained {
                tracing::debug!(queue, consumer, "pending entries drained");
                state.pending_drained = true;
            }
            state.buffered.extend(deliveries);
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        let stream = self.stream_key(&delivery.routing_key).await;
        let mut conn = self.publisher.clone();
        let acked: i64 = conn
            .xack(&stream, &delivery.queue, &[&delivery.tag.0])
            .await?;
        if acked == 0 {
            return Err(BusError::UnknownDeliveryTag {
                queue: delivery.queue.clone(),
                tag: delivery.tag.to_string(),
            });
        }
        Ok(())
    }
}
