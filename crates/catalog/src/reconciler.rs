//! Stock reconciliation consumer.
//!
//! Every `order.created` delivery ends in exactly one terminal state and is
//! acknowledged whatever that state is; there is no retry path. Stock is
//! taken with one atomic conditional decrement, so concurrent workers never
//! lose an update and never drive a quantity below zero.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bus::{Delivery, MessageBus, Topology};
use cache::{CacheKey, CacheStore, CacheStoreExt};
use domain::{DomainEvent, OrderPlaced};
use store::{ProductStore, StockDecrement};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Pause after a failed receive before asking the bus again.
const RECEIVE_BACKOFF: Duration = Duration::from_millis(500);

/// How redelivered messages are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconciliationPolicy {
    /// Every delivery takes one unit. A message redelivered after a crash
    /// between decrement and ack takes a second unit.
    #[default]
    AtMostOncePerDelivery,

    /// Orders carrying an `orderId` are recorded in a processed-orders ledger
    /// atomically with the decrement; a repeat delivery changes nothing.
    /// Payloads without an `orderId` behave as under
    /// [`AtMostOncePerDelivery`](Self::AtMostOncePerDelivery).
    Deduplicated,
}

/// Terminal state of one delivery. All of them are acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// The payload did not decode; dropped as poison.
    Rejected,
    /// One unit was taken and the product's cache entries were deleted.
    Applied,
    /// The product is missing or already at zero.
    OutOfStock,
    /// The store failed.
    Errored,
    /// The order was already reconciled.
    Duplicate,
}

impl ReconciliationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::Applied => "applied",
            Self::OutOfStock => "out_of_stock",
            Self::Errored => "errored",
            Self::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumer of the `order.created` queue.
///
/// Cheap to clone; each worker task runs its own clone and holds at most one
/// message in flight.
#[derive(Clone)]
pub struct StockReconciler {
    store: Arc<dyn ProductStore>,
    cache: Arc<dyn CacheStore>,
    bus: Arc<dyn MessageBus>,
    policy: ReconciliationPolicy,
    queue: String,
}

impl StockReconciler {
    pub fn new(
        store: Arc<dyn ProductStore>,
        cache: Arc<dyn CacheStore>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self {
            store,
            cache,
            bus,
            policy: ReconciliationPolicy::default(),
            queue: Topology::ORDER_CREATED_QUEUE.to_string(),
        }
    }

    pub fn with_policy(mut self, policy: ReconciliationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Drives one delivery to its terminal state without acknowledging it.
    #[tracing::instrument(
        skip(self, delivery),
        fields(queue = %delivery.queue, tag = %delivery.tag, redelivered = delivery.redelivered)
    )]
    pub async fn handle(&self, delivery: &Delivery) -> ReconciliationOutcome {
        let placed = match DomainEvent::decode(&delivery.routing_key, &delivery.payload) {
            Ok(DomainEvent::OrderCreated(placed)) => placed,
            Ok(other) => {
                tracing::warn!(event_type = other.event_type(), "unexpected event on queue");
                return ReconciliationOutcome::Rejected;
            }
            Err(e) => {
                tracing::warn!(error = %e, "undecodable order event");
                return ReconciliationOutcome::Rejected;
            }
        };

        match self.take_stock(&placed).await {
            Ok(true) => {
                self.cache
                    .invalidate(&CacheKey::product_views(placed.product_id))
                    .await;
                tracing::info!(product_id = %placed.product_id, "stock decremented");
                ReconciliationOutcome::Applied
            }
            Ok(false) => {
                tracing::warn!(
                    product_id = %placed.product_id,
                    "no stock taken, product missing or out of stock"
                );
                ReconciliationOutcome::OutOfStock
            }
            Err(outcome) => outcome,
        }
    }

    /// Returns whether a unit was taken, or the terminal state that ends
    /// the delivery early.
    async fn take_stock(
        &self,
        placed: &OrderPlaced,
    ) -> std::result::Result<bool, ReconciliationOutcome> {
        let product_id = placed.product_id;
        let result = match (self.policy, placed.order_id) {
            (ReconciliationPolicy::Deduplicated, Some(order_id)) => {
                match self.store.decrement_stock_once(product_id, order_id).await {
                    Ok(StockDecrement::Applied) => Ok(true),
                    Ok(StockDecrement::NotApplied) => Ok(false),
                    Ok(StockDecrement::AlreadyProcessed) => {
                        tracing::info!(%order_id, "order already reconciled");
                        return Err(ReconciliationOutcome::Duplicate);
                    }
                    Err(e) => Err(e),
                }
            }
            _ => self
                .store
                .decrement_stock(product_id)
                .await
                .map(|affected| affected > 0),
        };

        result.map_err(|e| {
            tracing::error!(%product_id, error = %e, "stock decrement failed");
            ReconciliationOutcome::Errored
        })
    }

    /// Handles a delivery, acknowledges it and records the outcome.
    pub async fn process(&self, delivery: Delivery) -> ReconciliationOutcome {
        let start = std::time::Instant::now();
        let outcome = self.handle(&delivery).await;
        if let Err(e) = self.bus.ack(&delivery).await {
            tracing::error!(tag = %delivery.tag, error = %e, "ack failed");
        }
        metrics::counter!("stock_reconciliation_total", "outcome" => outcome.as_str())
            .increment(1);
        metrics::histogram!("stock_reconciliation_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        outcome
    }

    /// Receives and processes deliveries until `shutdown` flips to `true` or
    /// its sender is dropped.
    ///
    /// Shutdown is only observed between messages; a delivery already
    /// received always reaches its terminal state first.
    pub async fn run(self, consumer: String, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(queue = %self.queue, policy = ?self.policy, "reconciler started");
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let received = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                received = self.bus.receive(&self.queue, &consumer) => received,
            };

            match received {
                Ok(delivery) => {
                    self.process(delivery).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "receive failed");
                    tokio::time::sleep(RECEIVE_BACKOFF).await;
                }
            }
        }
        tracing::info!("reconciler stopped");
    }

    /// Spawns `workers` consumer tasks named `stock-reconciler-<n>`.
    pub fn spawn_workers(
        &self,
        workers: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        (0..workers)
            .map(|n| {
                let consumer = format!("stock-reconciler-{n}");
                let span = tracing::info_span!("reconciler", consumer = %consumer);
                tokio::spawn(self.clone().run(consumer, shutdown.clone()).instrument(span))
            })
            .collect()
    }
}
