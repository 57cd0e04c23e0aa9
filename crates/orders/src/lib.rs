//! Orders domain module.
//!
//! This crate contains the order aggregate and its lifecycle state machine,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod event;
pub mod item;
pub mod order;
pub mod status;

pub use event::{ORDER_AGGREGATE_TYPE, OrderEvent, OrderEventKind};
pub use item::OrderItem;
pub use order::Order;
pub use status::{Operation, OrderStatus};
