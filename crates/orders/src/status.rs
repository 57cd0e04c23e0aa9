use serde::{Deserialize, Serialize};

/// Order status lifecycle.
///
/// ```text
/// Pending ─confirm→ Confirmed ─mark paid→ Paid ─ship→ Shipped ─deliver→ Delivered ─return→ Returned
///    └──────────────┴─────────────────────┴─cancel→ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

/// A named lifecycle operation on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Confirm,
    MarkPaid,
    Ship,
    Deliver,
    Cancel,
    Return,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }

    /// Target status of `operation` from this status, or `None` if not allowed.
    pub fn next(self, operation: Operation) -> Option<OrderStatus> {
        use OrderStatus::*;

        match (self, operation) {
            (Pending, Operation::Confirm) => Some(Confirmed),
            (Confirmed, Operation::MarkPaid) => Some(Paid),
            (Paid, Operation::Ship) => Some(Shipped),
            (Shipped, Operation::Deliver) => Some(Delivered),
            (Delivered, Operation::Return) => Some(Returned),
            (Pending | Confirmed | Paid, Operation::Cancel) => Some(Cancelled),
            _ => None,
        }
    }

    pub fn can_transition(self, operation: Operation) -> bool {
        self.next(operation).is_some()
    }

    /// No operation leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }

    /// Whether an order in this status has taken units off the stock ledger.
    pub fn holds_stock(self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed | OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Delivered
        )
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Confirm,
        Operation::MarkPaid,
        Operation::Ship,
        Operation::Deliver,
        Operation::Cancel,
        Operation::Return,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Confirm => "confirm",
            Operation::MarkPaid => "mark paid",
            Operation::Ship => "ship",
            Operation::Deliver => "deliver",
            Operation::Cancel => "cancel",
            Operation::Return => "return",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
