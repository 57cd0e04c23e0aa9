use thiserror::Error;

use ordermgmt_core::{Currency, DomainError, OrderId, ProductId};

use crate::store::StoreError;

/// Coarse classification of coordinator failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    InsufficientStock,
    InvalidStateTransition,
    CurrencyMismatch,
    PaymentDeclined,
    ShippingUnavailable,
    Concurrency,
    Infrastructure,
}

/// Failure of a coordinated order operation.
///
/// Every variant except `Concurrency` and `Store` aborts the operation before
/// anything is persisted.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("order must contain at least one item")]
    EmptyOrder,

    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: u32,
    },

    #[error("cannot {operation} an order that is {from}")]
    InvalidStateTransition {
        from: &'static str,
        operation: &'static str,
    },

    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    #[error("payment declined for order {0}")]
    PaymentDeclined(OrderId),

    #[error("shipping unavailable for order {order_id}: {reason}")]
    ShippingUnavailable { order_id: OrderId, reason: String },

    /// Optimistic concurrency conflict that was not (or could not be) retried.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    #[error("store failure: {0}")]
    Store(StoreError),
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::OrderNotFound(_) | CoordinatorError::ProductNotFound(_) => {
                ErrorKind::NotFound
            }
            CoordinatorError::Validation(_) | CoordinatorError::EmptyOrder => ErrorKind::Validation,
            CoordinatorError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoordinatorError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            CoordinatorError::CurrencyMismatch { .. } => ErrorKind::CurrencyMismatch,
            CoordinatorError::PaymentDeclined(_) => ErrorKind::PaymentDeclined,
            CoordinatorError::ShippingUnavailable { .. } => ErrorKind::ShippingUnavailable,
            CoordinatorError::Concurrency(_) => ErrorKind::Concurrency,
            CoordinatorError::Store(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<StoreError> for CoordinatorError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => CoordinatorError::Concurrency(msg),
            other => CoordinatorError::Store(other),
        }
    }
}

impl From<DomainError> for CoordinatorError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvalidAmount(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvariantViolation(msg) => CoordinatorError::Validation(msg),
            DomainError::CurrencyMismatch { expected, found } => {
                CoordinatorError::CurrencyMismatch { expected, found }
            }
            DomainError::EmptyOrder => CoordinatorError::EmptyOrder,
            DomainError::InsufficientStock {
                product,
                requested,
                available,
            } => CoordinatorError::InsufficientStock {
                product,
                requested,
                available,
            },
            DomainError::InvalidStateTransition { from, operation } => {
                CoordinatorError::InvalidStateTransition { from, operation }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_kind() {
        let err: CoordinatorError = DomainError::InvalidStateTransition {
            from: "confirmed",
            operation: "ship",
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
        assert_eq!(err.to_string(), "cannot ship an order that is confirmed");

        let err: CoordinatorError = DomainError::EmptyOrder.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn store_concurrency_maps_to_concurrency() {
        let err: CoordinatorError = StoreError::Concurrency("stale".into()).into();
        assert_eq!(err.kind(), ErrorKind::Concurrency);

        let err: CoordinatorError = StoreError::Unavailable("lock poisoned".into()).into();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }
}
