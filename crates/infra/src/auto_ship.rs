//! Ships paid orders in the background.
//!
//! When an order is paid, [`AutoShipOnPaid`] asks the coordinator to ship it.
//! A shipping provider outage is retried with backoff; when the retry budget
//! is spent the order stays Paid and lands in the [`ManualInterventionQueue`].

use std::sync::{Arc, Mutex};
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use ordermgmt_core::OrderId;
use ordermgmt_events::{EventEnvelope, EventHandler};
use ordermgmt_orders::{OrderEvent, OrderEventKind};

use crate::coordinator::{ErrorKind, OrderShipper};
use crate::retry::RetryPolicy;

/// A paid order the auto-shipper gave up on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualIntervention {
    pub order_id: OrderId,
    pub attempts: u32,
    pub last_error: String,
    pub recorded_at: DateTime<Utc>,
}

/// Shared list of orders awaiting an operator.
#[derive(Debug, Clone, Default)]
pub struct ManualInterventionQueue {
    entries: Arc<Mutex<Vec<ManualIntervention>>>,
}

impl ManualInterventionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: ManualIntervention) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    /// Snapshot of the parked orders, oldest first.
    pub fn list(&self) -> Vec<ManualIntervention> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Take every parked order, leaving the queue empty.
    pub fn drain(&self) -> Vec<ManualIntervention> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Subscriber reacting to `Paid` by shipping the order.
///
/// Idempotent: an order that is no longer Paid (already shipped, cancelled)
/// is skipped.
pub struct AutoShipOnPaid<S> {
    shipper: S,
    policy: RetryPolicy,
    queue: ManualInterventionQueue,
}

impl<S> AutoShipOnPaid<S> {
    pub fn new(shipper: S, policy: RetryPolicy, queue: ManualInterventionQueue) -> Self {
        Self {
            shipper,
            policy,
            queue,
        }
    }
}

impl<S> EventHandler<EventEnvelope<OrderEvent>> for AutoShipOnPaid<S>
where
    S: OrderShipper + 'static,
{
    type Error = anyhow::Error;

    fn name(&self) -> &'static str {
        "auto-ship"
    }

    fn handle(&mut self, envelope: &EventEnvelope<OrderEvent>) -> anyhow::Result<()> {
        let event = envelope.payload();
        if !matches!(event.kind, OrderEventKind::Paid { .. }) {
            return Ok(());
        }
        let order_id = event.order_id;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let err = match self.shipper.ship_order(order_id) {
                Ok(order) => {
                    info!(
                        order_id = %order_id,
                        attempt,
                        tracking_reference = order.tracking_reference().unwrap_or_default(),
                        "paid order shipped"
                    );
                    return Ok(());
                }
                Err(err) => err,
            };

            match err.kind() {
                ErrorKind::ShippingUnavailable | ErrorKind::Concurrency => {
                    if self.policy.should_retry(attempt) {
                        let delay = self.policy.delay_for_attempt(attempt);
                        debug!(order_id = %order_id, attempt, ?delay, error = %err, "shipment failed, retrying");
                        thread::sleep(delay);
                        continue;
                    }

                    warn!(
                        order_id = %order_id,
                        attempts = attempt,
                        error = %err,
                        "shipment retries exhausted, order needs manual intervention"
                    );
                    self.queue.push(ManualIntervention {
                        order_id,
                        attempts: attempt,
                        last_error: err.to_string(),
                        recorded_at: Utc::now(),
                    });
                    return Ok(());
                }
                ErrorKind::InvalidStateTransition | ErrorKind::NotFound => {
                    debug!(order_id = %order_id, error = %err, "order no longer shippable, skipping");
                    return Ok(());
                }
                _ => return Err(err.into()),
            }
        }
    }
}
