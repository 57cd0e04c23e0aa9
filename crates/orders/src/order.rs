use chrono::{DateTime, Utc};

use ordermgmt_core::{AggregateRoot, CustomerId, DomainError, DomainResult, Money, OrderId};
use ordermgmt_events::EventLog;

use crate::event::{OrderEvent, OrderEventKind};
use crate::item::OrderItem;
use crate::status::{Operation, OrderStatus};

/// Aggregate root: Order.
///
/// An order owns its items and walks the lifecycle described by
/// [`OrderStatus`]. Every transition either applies completely (status,
/// timestamp and event) or fails with the order untouched.
///
/// Identity is assigned by the store on first persistence; transitions that
/// record an event require it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: Option<OrderId>,
    customer_id: CustomerId,
    items: Vec<OrderItem>,
    status: OrderStatus,
    total_amount: Money,
    tracking_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
    created_recorded: bool,
    events: EventLog<OrderEvent>,
}

impl Order {
    /// Create a pending order. The total is the sum of the item totals.
    pub fn new(
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let first = items.first().ok_or(DomainError::EmptyOrder)?;
        let total_amount = items
            .iter()
            .try_fold(Money::zero(first.total_price().currency()), |acc, item| {
                acc.add(&item.total_price())
            })?;

        Ok(Self {
            id: None,
            customer_id,
            items,
            status: OrderStatus::Pending,
            total_amount,
            tracking_reference: None,
            created_at,
            updated_at: created_at,
            version: 0,
            created_recorded: false,
            events: EventLog::new(),
        })
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn tracking_reference(&self) -> Option<&str> {
        self.tracking_reference.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn pending_events(&self) -> &[OrderEvent] {
        self.events.pending()
    }

    /// Hand out every pending event exactly once.
    pub fn drain_events(&mut self) -> Vec<OrderEvent> {
        self.events.drain()
    }

    /// Drop pending events without handing them out.
    pub fn clear_events(&mut self) {
        self.events.drain();
    }

    /// Give the order its identity. Identity never changes once assigned.
    pub fn assign_id(&mut self, id: OrderId) -> DomainResult<()> {
        match self.id {
            None => {
                self.id = Some(id);
                Ok(())
            }
            Some(existing) if existing == id => Ok(()),
            Some(existing) => Err(DomainError::invariant(format!(
                "order {existing} cannot be re-identified as {id}"
            ))),
        }
    }

    /// Record the revision assigned by the store on commit.
    pub fn mark_persisted(&mut self, version: u64) {
        self.version = version;
    }

    /// Record the creation event once the order has an identity.
    pub fn record_created(&mut self) -> DomainResult<()> {
        let id = self.require_id()?;
        if self.created_recorded {
            return Err(DomainError::invariant("creation already recorded"));
        }
        self.created_recorded = true;
        self.events.record(OrderEvent::new(
            id,
            OrderEventKind::Created {
                customer_id: self.customer_id,
            },
            self.created_at,
        ));
        Ok(())
    }

    /// Fail with `InvalidStateTransition` unless `operation` is allowed now.
    pub fn ensure_can(&self, operation: Operation) -> DomainResult<OrderStatus> {
        self.status
            .next(operation)
            .ok_or(DomainError::InvalidStateTransition {
                from: self.status.as_str(),
                operation: operation.as_str(),
            })
    }

    pub fn confirm(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(Operation::Confirm, at, Some(OrderEventKind::Confirmed))
    }

    pub fn mark_paid(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        let amount = self.total_amount;
        self.transition(Operation::MarkPaid, at, Some(OrderEventKind::Paid { amount }))
    }

    pub fn ship(&mut self, tracking_reference: impl Into<String>, at: DateTime<Utc>) -> DomainResult<()> {
        let tracking_reference = tracking_reference.into();
        if tracking_reference.trim().is_empty() {
            return Err(DomainError::validation("tracking reference cannot be empty"));
        }
        self.transition(
            Operation::Ship,
            at,
            Some(OrderEventKind::Shipped {
                tracking_reference: tracking_reference.clone(),
            }),
        )?;
        self.tracking_reference = Some(tracking_reference);
        Ok(())
    }

    pub fn deliver(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(Operation::Deliver, at, None)
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(Operation::Cancel, at, None)
    }

    pub fn return_order(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(Operation::Return, at, None)
    }

    fn transition(
        &mut self,
        operation: Operation,
        at: DateTime<Utc>,
        event: Option<OrderEventKind>,
    ) -> DomainResult<()> {
        let next = self.ensure_can(operation)?;
        let event = match event {
            Some(kind) => Some(OrderEvent::new(self.require_id()?, kind, at)),
            None => None,
        };

        self.status = next;
        self.updated_at = at;
        if let Some(event) = event {
            self.events.record(event);
        }
        Ok(())
    }

    fn require_id(&self) -> DomainResult<OrderId> {
        self.id
            .ok_or_else(|| DomainError::invariant("order has no identity yet"))
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> Option<&Self::Id> {
        self.id.as_ref()
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordermgmt_core::{Currency, ProductId};
    use rust_decimal_macros::dec;

    fn at(offset_secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + offset_secs, 0).unwrap()
    }

    fn item(name: &str, unit: rust_decimal::Decimal, qty: u32) -> OrderItem {
        OrderItem::new(ProductId::new(), name, Money::euro(unit).unwrap(), qty).unwrap()
    }

    fn test_order() -> Order {
        let mut order = Order::new(
            CustomerId::new(),
            vec![item("Widget", dec!(10.00), 2), item("Gadget", dec!(15.00), 1)],
            at(0),
        )
        .unwrap();
        order.assign_id(OrderId::new()).unwrap();
        order
    }

    fn expect_invalid_transition(result: DomainResult<()>) {
        match result {
            Err(DomainError::InvalidStateTransition { .. }) => {}
            other => panic!("Expected InvalidStateTransition, got {other:?}"),
        }
    }

    #[test]
    fn new_order_is_pending_with_summed_total() {
        let order = test_order();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_amount(), Money::euro(dec!(35.00)).unwrap());
        assert_eq!(order.created_at(), order.updated_at());
        assert_eq!(order.version(), 0);
        assert!(order.pending_events().is_empty());
    }

    #[test]
    fn empty_order_is_rejected() {
        let err = Order::new(CustomerId::new(), vec![], at(0)).unwrap_err();
        assert_eq!(err, DomainError::EmptyOrder);
    }

    #[test]
    fn mixed_currencies_are_rejected() {
        let usd = OrderItem::new(
            ProductId::new(),
            "Dollar thing",
            Money::of(dec!(1.00), Currency::USD).unwrap(),
            1,
        )
        .unwrap();
        let err = Order::new(CustomerId::new(), vec![item("Widget", dec!(1.00), 1), usd], at(0))
            .unwrap_err();
        assert!(matches!(err, DomainError::CurrencyMismatch { .. }));
    }

    #[test]
    fn confirm_records_event_and_updates_timestamp() {
        let mut order = test_order();
        order.confirm(at(5)).unwrap();

        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.updated_at(), at(5));
        assert!(order.updated_at() > order.created_at());

        let events = order.pending_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, OrderEventKind::Confirmed);
        assert_eq!(Some(events[0].order_id), order.order_id());
    }

    #[test]
    fn confirm_twice_fails() {
        let mut order = test_order();
        order.confirm(at(1)).unwrap();
        expect_invalid_transition(order.confirm(at(2)));
        assert_eq!(order.pending_events().len(), 1);
    }

    #[test]
    fn mark_paid_requires_confirmation() {
        let mut order = test_order();
        expect_invalid_transition(order.mark_paid(at(1)));
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn paid_event_carries_total() {
        let mut order = test_order();
        order.confirm(at(1)).unwrap();
        order.mark_paid(at(2)).unwrap();

        let last = order.pending_events().last().unwrap();
        assert_eq!(
            last.kind,
            OrderEventKind::Paid {
                amount: Money::euro(dec!(35.00)).unwrap()
            }
        );
    }

    #[test]
    fn ship_sets_tracking_reference() {
        let mut order = test_order();
        order.confirm(at(1)).unwrap();
        order.mark_paid(at(2)).unwrap();
        order.ship("TRACK-00000001", at(3)).unwrap();

        assert_eq!(order.status(), OrderStatus::Shipped);
        assert_eq!(order.tracking_reference(), Some("TRACK-00000001"));
    }

    #[test]
    fn ship_before_payment_leaves_no_tracking() {
        let mut order = test_order();
        order.confirm(at(1)).unwrap();
        expect_invalid_transition(order.ship("TRACK-1", at(2)));
        assert_eq!(order.tracking_reference(), None);
    }

    #[test]
    fn cancel_after_shipping_fails() {
        let mut order = test_order();
        order.confirm(at(1)).unwrap();
        order.mark_paid(at(2)).unwrap();
        order.ship("TRACK-1", at(3)).unwrap();

        expect_invalid_transition(order.cancel(at(4)));
        assert_eq!(order.status(), OrderStatus::Shipped);
    }

    #[test]
    fn full_lifecycle_ends_returned() {
        let mut order = test_order();
        order.confirm(at(1)).unwrap();
        order.mark_paid(at(2)).unwrap();
        order.ship("TRACK-1", at(3)).unwrap();
        order.deliver(at(4)).unwrap();
        order.return_order(at(5)).unwrap();

        assert_eq!(order.status(), OrderStatus::Returned);
        assert_eq!(order.pending_events().len(), 3);
        expect_invalid_transition(order.cancel(at(6)));
    }

    #[test]
    fn transitions_with_events_require_identity() {
        let mut order =
            Order::new(CustomerId::new(), vec![item("Widget", dec!(1.00), 1)], at(0)).unwrap();
        let err = order.confirm(at(1)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn created_is_recorded_once() {
        let mut order = test_order();
        order.record_created().unwrap();
        assert!(matches!(
            order.record_created(),
            Err(DomainError::InvariantViolation(_))
        ));

        let events = order.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            OrderEventKind::Created {
                customer_id: order.customer_id()
            }
        );
        assert!(order.pending_events().is_empty());
    }

    #[test]
    fn identity_cannot_change() {
        let mut order = test_order();
        let id = order.order_id().unwrap();
        order.assign_id(id).unwrap();
        assert!(order.assign_id(OrderId::new()).is_err());
        assert_eq!(order.order_id(), Some(id));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn operation() -> impl Strategy<Value = Operation> {
            prop::sample::select(Operation::ALL.to_vec())
        }

        fn apply(order: &mut Order, op: Operation, t: DateTime<Utc>) -> DomainResult<()> {
            match op {
                Operation::Confirm => order.confirm(t),
                Operation::MarkPaid => order.mark_paid(t),
                Operation::Ship => order.ship("TRACK-00000001", t),
                Operation::Deliver => order.deliver(t),
                Operation::Cancel => order.cancel(t),
                Operation::Return => order.return_order(t),
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: the total equals the sum of item totals.
            #[test]
            fn total_is_sum_of_items(lines in prop::collection::vec((1u32..10_000, 1u32..20), 1..8)) {
                let items: Vec<_> = lines
                    .iter()
                    .map(|(cents, qty)| {
                        item("Line", rust_decimal::Decimal::new(i64::from(*cents), 2), *qty)
                    })
                    .collect();
                let expected: rust_decimal::Decimal =
                    items.iter().map(|i| i.total_price().amount()).sum();

                let order = Order::new(CustomerId::new(), items, at(0)).unwrap();
                prop_assert_eq!(order.total_amount().amount(), expected);
            }

            /// Property: status follows the transition table; rejected operations
            /// change nothing and record no event.
            #[test]
            fn status_follows_transition_table(ops in prop::collection::vec(operation(), 0..20)) {
                let mut order = test_order();
                for (i, op) in ops.into_iter().enumerate() {
                    let before = order.clone();
                    let expected = before.status().next(op);
                    let result = apply(&mut order, op, at(i as i64 + 1));

                    match expected {
                        Some(next) => {
                            prop_assert!(result.is_ok());
                            prop_assert_eq!(order.status(), next);
                        }
                        None => {
                            prop_assert!(result.is_err());
                            prop_assert_eq!(&order, &before);
                        }
                    }
                }
            }
        }
    }
}
