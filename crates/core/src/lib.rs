//! `ordermgmt-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the `Money` value type, the domain error model and the
//! aggregate root contract shared by orders and products.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, EventId, OrderId, ProductId};
pub use money::{Currency, Money};
