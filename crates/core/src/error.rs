//! Domain error model.

use thiserror::Error;

use crate::money::Currency;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. zero quantity, blank name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A monetary amount was rejected (e.g. negative).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Arithmetic between two amounts of different currencies.
    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    /// An order was constructed without line items.
    #[error("an order must contain at least one item")]
    EmptyOrder,

    /// A stock ledger could not satisfy the requested quantity.
    #[error("insufficient stock for product '{product}': requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: u32,
    },

    /// An operation was attempted from a status that does not allow it.
    #[error("cannot {operation} an order in status {from}")]
    InvalidStateTransition {
        from: &'static str,
        operation: &'static str,
    },

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
