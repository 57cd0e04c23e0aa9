//! Order lifecycle orchestration.
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! 1. Load the order (and the products it touches) from the store
//!   ↓
//! 2. Validate the transition (before any external capability is called)
//!   ↓
//! 3. Decide: mutate in-memory snapshots (stock ledger, order status)
//!   ↓
//! 4. Commit one ChangeSet (optimistic version check, all or nothing)
//!   ↓
//! 5. Drain the order's recorded events and publish them on the bus
//! ```
//!
//! A failure in steps 1–4 commits nothing and publishes nothing. Snapshots
//! staged by a failed step are discarded, so a confirm that fails on its third
//! line leaves the first two products exactly as they were.
//!
//! Steps 1–5 run under a per-order lock, so concurrent calls on one order
//! queue behind each other: the second payment for an order sees it Paid and
//! fails `InvalidStateTransition` without charging. Products are shared
//! between orders and stay under optimistic control. A store-only operation
//! that loses a race on a product is re-run from fresh state. Operations that
//! call an external capability (payment, shipping) are not re-run, because
//! that would repeat the side effect; they surface `Concurrency` instead.

pub mod error;
mod locks;

pub use error::{CoordinatorError, ErrorKind};

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use ordermgmt_core::{AggregateRoot, CustomerId, OrderId, ProductId};
use ordermgmt_events::{Event, EventBus, EventEnvelope};
use ordermgmt_orders::{ORDER_AGGREGATE_TYPE, Operation, Order, OrderEvent, OrderItem, OrderStatus};
use ordermgmt_products::Product;

use crate::capabilities::{PaymentGateway, ShippingGateway};
use crate::store::{ChangeSet, Store, StoreError};

use locks::OrderLocks;

/// One requested line of a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How many times a store-only operation is re-run after losing an
    /// optimistic race.
    pub max_conflict_retries: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
        }
    }
}

/// Something that can ship an order by id (used by the auto-ship subscriber).
pub trait OrderShipper: Send + Sync {
    fn ship_order(&self, order_id: OrderId) -> Result<Order, CoordinatorError>;
}

impl<T> OrderShipper for Arc<T>
where
    T: OrderShipper + ?Sized,
{
    fn ship_order(&self, order_id: OrderId) -> Result<Order, CoordinatorError> {
        (**self).ship_order(order_id)
    }
}

/// Coordinates order lifecycle operations across the order, the stock ledger,
/// the external capabilities and the event bus.
///
/// ## Generic Parameters
///
/// - `S`: persistence (orders, products and the multi-aggregate commit)
/// - `B`: bus receiving committed order events
pub struct OrderCoordinator<S, B> {
    store: S,
    payment: Arc<dyn PaymentGateway>,
    shipping: Arc<dyn ShippingGateway>,
    bus: B,
    config: CoordinatorConfig,
    locks: OrderLocks,
}

impl<S, B> core::fmt::Debug for OrderCoordinator<S, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OrderCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, B> OrderCoordinator<S, B> {
    pub fn new(
        store: S,
        payment: Arc<dyn PaymentGateway>,
        shipping: Arc<dyn ShippingGateway>,
        bus: B,
    ) -> Self {
        Self {
            store,
            payment,
            shipping,
            bus,
            config: CoordinatorConfig::default(),
            locks: OrderLocks::new(),
        }
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> OrderCoordinator<S, B>
where
    S: Store,
    B: EventBus<EventEnvelope<OrderEvent>>,
{
    /// Create a pending order from product snapshots.
    ///
    /// Stock is checked, not reserved: nothing on the ledger changes until the
    /// order is confirmed. Lines naming the same product are checked against
    /// their combined quantity.
    pub fn create_order(
        &self,
        customer_id: CustomerId,
        lines: &[OrderLine],
    ) -> Result<Order, CoordinatorError> {
        let span = info_span!("create_order", customer_id = %customer_id, lines = lines.len());
        let _guard = span.enter();

        if lines.is_empty() {
            return Err(CoordinatorError::EmptyOrder);
        }

        let mut requested: Vec<(ProductId, u32)> = Vec::new();
        for line in lines {
            match requested.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, total)) => {
                    *total = total.checked_add(line.quantity).ok_or_else(|| {
                        CoordinatorError::Validation(format!(
                            "requested quantity of product {} overflows",
                            line.product_id
                        ))
                    })?;
                }
                None => requested.push((line.product_id, line.quantity)),
            }
        }

        let mut products = Vec::with_capacity(requested.len());
        for (product_id, quantity) in requested {
            let product = self.load_product(product_id)?;
            if !product.is_available(quantity) {
                return Err(CoordinatorError::InsufficientStock {
                    product: product.name().to_string(),
                    requested: quantity,
                    available: product.stock_quantity(),
                });
            }
            products.push(product);
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let product = products
                .iter()
                .find(|p| p.id_typed() == line.product_id)
                .ok_or(CoordinatorError::ProductNotFound(line.product_id))?;
            items.push(OrderItem::from_product(product, line.quantity)?);
        }

        let order = Order::new(customer_id, items, Utc::now())?;
        let mut order = self.store.commit(ChangeSet::new().with_order(order))?.into_order()?;
        order.record_created()?;
        self.publish(&mut order);

        info!(
            order_id = ?order.order_id(),
            total = %order.total_amount(),
            "order created"
        );
        Ok(order)
    }

    /// Take every item off the stock ledger and confirm the order.
    pub fn confirm_order(&self, order_id: OrderId) -> Result<Order, CoordinatorError> {
        self.run(order_id, Operation::Confirm, true, |order, changes| {
            let mut staged = Vec::new();
            for item in order.items() {
                self.stage_product(&mut staged, item.product_id())?
                    .decrease(item.quantity())?;
            }
            order.confirm(Utc::now())?;
            changes.push_products(staged);
            Ok(())
        })
    }

    /// Charge the order total; on approval the order becomes Paid.
    pub fn process_payment(&self, order_id: OrderId) -> Result<Order, CoordinatorError> {
        self.run(order_id, Operation::MarkPaid, false, |order, _| {
            if !self.payment.charge(order.total_amount()) {
                return Err(CoordinatorError::PaymentDeclined(order_id));
            }
            order.mark_paid(Utc::now())?;
            Ok(())
        })
    }

    /// Book a shipment; on success the order becomes Shipped.
    pub fn ship_order(&self, order_id: OrderId) -> Result<Order, CoordinatorError> {
        self.run(order_id, Operation::Ship, false, |order, _| {
            let tracking_reference = self.shipping.create_shipment(order).map_err(|err| {
                CoordinatorError::ShippingUnavailable {
                    order_id,
                    reason: err.to_string(),
                }
            })?;
            order.ship(tracking_reference, Utc::now())?;
            Ok(())
        })
    }

    pub fn deliver_order(&self, order_id: OrderId) -> Result<Order, CoordinatorError> {
        self.run(order_id, Operation::Deliver, true, |order, _| {
            order.deliver(Utc::now())?;
            Ok(())
        })
    }

    /// Cancel the order, putting its items back on the ledger if they were taken.
    pub fn cancel_order(&self, order_id: OrderId) -> Result<Order, CoordinatorError> {
        self.run(order_id, Operation::Cancel, true, |order, changes| {
            if order.status().holds_stock() {
                changes.push_products(self.restock(order)?);
            }
            order.cancel(Utc::now())?;
            Ok(())
        })
    }

    /// Take back a delivered order, putting its items back on the ledger.
    pub fn return_order(&self, order_id: OrderId) -> Result<Order, CoordinatorError> {
        self.run(order_id, Operation::Return, true, |order, changes| {
            changes.push_products(self.restock(order)?);
            order.return_order(Utc::now())?;
            Ok(())
        })
    }

    pub fn find_order(&self, order_id: OrderId) -> Result<Order, CoordinatorError> {
        self.load_order(order_id)
    }

    pub fn find_orders_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, CoordinatorError> {
        Ok(self.store.find_by_customer_id(customer_id)?)
    }

    pub fn find_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, CoordinatorError> {
        Ok(self.store.find_by_status(status)?)
    }

    /// Every order, in creation order.
    pub fn list_orders(&self) -> Result<Vec<Order>, CoordinatorError> {
        Ok(self.store.find_all()?)
    }

    /// Load, validate, decide, commit and publish one transition while holding
    /// the order's lock.
    fn run<F>(
        &self,
        order_id: OrderId,
        operation: Operation,
        retry_on_conflict: bool,
        decide: F,
    ) -> Result<Order, CoordinatorError>
    where
        F: Fn(&mut Order, &mut ChangeSet) -> Result<(), CoordinatorError>,
    {
        let span = info_span!("order_operation", order_id = %order_id, operation = operation.as_str());
        let _guard = span.enter();
        let _order_lock = self.locks.acquire(order_id);

        let attempts = if retry_on_conflict {
            self.config.max_conflict_retries.saturating_add(1)
        } else {
            1
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut order = self.load_order(order_id)?;
            order.ensure_can(operation)?;

            let mut changes = ChangeSet::new();
            decide(&mut order, &mut changes)?;
            changes.push_order(order);

            match self.store.commit(changes) {
                Ok(committed) => {
                    let mut order = committed.into_order()?;
                    self.publish(&mut order);
                    info!(status = %order.status(), version = order.version(), "order updated");
                    return Ok(order);
                }
                Err(StoreError::Concurrency(msg)) if attempt < attempts => {
                    debug!(attempt, reason = %msg, "commit lost optimistic race, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Return the staged copy of a product, loading it on first use so that
    /// several lines for one product share one ledger.
    fn stage_product<'a>(
        &self,
        staged: &'a mut Vec<Product>,
        product_id: ProductId,
    ) -> Result<&'a mut Product, CoordinatorError> {
        let idx = match staged.iter().position(|p| p.id_typed() == product_id) {
            Some(idx) => idx,
            None => {
                staged.push(self.load_product(product_id)?);
                staged.len() - 1
            }
        };
        Ok(&mut staged[idx])
    }

    fn restock(&self, order: &Order) -> Result<Vec<Product>, CoordinatorError> {
        let mut staged = Vec::new();
        for item in order.items() {
            self.stage_product(&mut staged, item.product_id())?
                .increase(item.quantity())?;
        }
        Ok(staged)
    }

    fn load_order(&self, order_id: OrderId) -> Result<Order, CoordinatorError> {
        self.store
            .find_by_id(order_id)?
            .ok_or(CoordinatorError::OrderNotFound(order_id))
    }

    fn load_product(&self, product_id: ProductId) -> Result<Product, CoordinatorError> {
        self.store
            .find_product(product_id)?
            .ok_or(CoordinatorError::ProductNotFound(product_id))
    }

    /// Publish the order's recorded events. The commit already happened, so a
    /// bus failure is logged and never undoes it.
    fn publish(&self, order: &mut Order) {
        let Some(order_id) = order.order_id() else {
            return;
        };
        let sequence_number = order.version();

        for event in order.drain_events() {
            let event_type = event.event_type();
            let envelope = EventEnvelope::new(
                event.event_id(),
                order_id.into(),
                ORDER_AGGREGATE_TYPE,
                sequence_number,
                event,
            );
            match self.bus.publish(envelope) {
                Ok(()) => debug!(order_id = %order_id, event_type, "event published"),
                Err(err) => {
                    warn!(order_id = %order_id, event_type, error = ?err, "event publication failed")
                }
            }
        }
    }
}

impl<S, B> OrderShipper for OrderCoordinator<S, B>
where
    S: Store,
    B: EventBus<EventEnvelope<OrderEvent>>,
{
    fn ship_order(&self, order_id: OrderId) -> Result<Order, CoordinatorError> {
        OrderCoordinator::ship_order(self, order_id)
    }
}
