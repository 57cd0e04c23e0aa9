use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ordermgmt_core::{CustomerId, EventId, Money, OrderId};
use ordermgmt_events::Event;

/// Aggregate type stamped on envelopes of order events.
pub const ORDER_AGGREGATE_TYPE: &str = "orders.order";

/// What happened to the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderEventKind {
    Created { customer_id: CustomerId },
    Confirmed,
    Paid { amount: Money },
    Shipped { tracking_reference: String },
}

/// Event recorded by an order at the moment of a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_id: EventId,
    pub occurred_on: DateTime<Utc>,
    pub order_id: OrderId,
    pub kind: OrderEventKind,
}

impl OrderEvent {
    pub fn new(order_id: OrderId, kind: OrderEventKind, occurred_on: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            occurred_on,
            order_id,
            kind,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self.kind, OrderEventKind::Paid { .. })
    }
}

impl Event for OrderEvent {
    fn event_id(&self) -> EventId {
        self.event_id
    }

    fn event_type(&self) -> &'static str {
        match self.kind {
            OrderEventKind::Created { .. } => "orders.order.created",
            OrderEventKind::Confirmed => "orders.order.confirmed",
            OrderEventKind::Paid { .. } => "orders.order.paid",
            OrderEventKind::Shipped { .. } => "orders.order.shipped",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn serializes_with_kind_tag() {
        let event = OrderEvent::new(
            OrderId::new(),
            OrderEventKind::Paid {
                amount: Money::euro(dec!(35.00)).unwrap(),
            },
            Utc::now(),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"]["kind"], "paid");
        assert_eq!(json["kind"]["amount"]["currency"], "EUR");

        let back: OrderEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.event_type(), "orders.order.paid");
    }

    #[test]
    fn events_get_distinct_ids() {
        let order_id = OrderId::new();
        let at = Utc::now();
        let a = OrderEvent::new(order_id, OrderEventKind::Confirmed, at);
        let b = OrderEvent::new(order_id, OrderEventKind::Confirmed, at);
        assert_ne!(a.event_id, b.event_id);
    }
}
