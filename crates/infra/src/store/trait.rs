use std::sync::Arc;

use thiserror::Error;

use ordermgmt_core::{CustomerId, OrderId, ProductId};
use ordermgmt_orders::{Order, OrderStatus};
use ordermgmt_products::Product;

/// Store operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed (a staged aggregate is stale).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// The change set itself is malformed (e.g. the same aggregate staged twice).
    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    /// The backend cannot serve the request (e.g. a poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Aggregates staged for one atomic write.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub orders: Vec<Order>,
    pub products: Vec<Product>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.products.push(product);
        self
    }

    pub fn push_order(&mut self, order: Order) {
        self.orders.push(order);
    }

    pub fn push_products(&mut self, products: impl IntoIterator<Item = Product>) {
        self.products.extend(products);
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty() && self.products.is_empty()
    }
}

/// Result of a successful commit: the staged aggregates with their identity and
/// new version assigned, in staging order.
///
/// Returned orders keep their pending events so the caller can drain and
/// publish them; stored copies never hold pending events.
#[derive(Debug, Clone)]
pub struct Committed {
    pub orders: Vec<Order>,
    pub products: Vec<Product>,
}

impl Committed {
    /// The single committed order of a one-order change set.
    pub fn into_order(self) -> Result<Order, StoreError> {
        let count = self.orders.len();
        let mut orders = self.orders.into_iter();
        match (orders.next(), count) {
            (Some(order), 1) => Ok(order),
            _ => Err(StoreError::InvalidCommit(format!(
                "expected exactly one committed order, found {count}"
            ))),
        }
    }
}

/// Order persistence.
///
/// `save` is a single-aggregate commit: an order without identity is inserted
/// and receives a fresh [`OrderId`]; an existing order must carry the version
/// currently stored.
pub trait OrderStore: Send + Sync {
    fn save(&self, order: Order) -> Result<Order, StoreError>;

    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    fn find_by_customer_id(&self, customer_id: CustomerId) -> Result<Vec<Order>, StoreError>;

    fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError>;

    /// Every order, in creation order.
    fn find_all(&self) -> Result<Vec<Order>, StoreError>;
}

/// Product catalog and stock ledger persistence.
pub trait ProductStore: Send + Sync {
    fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    fn save_product(&self, product: Product) -> Result<Product, StoreError>;

    /// Every product, in insertion order.
    fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Products holding at least `min_quantity` units.
    fn find_available(&self, min_quantity: u32) -> Result<Vec<Product>, StoreError>;
}

/// Multi-aggregate atomic write.
///
/// Implementations must:
/// - check every staged aggregate's version against the stored one
///   (`ExpectedVersion::of`, where "not stored" counts as version 0)
/// - assign identities to new orders and bump every version by one
/// - apply all writes or none
pub trait UnitOfWork: Send + Sync {
    fn commit(&self, changes: ChangeSet) -> Result<Committed, StoreError>;
}

/// Everything the coordinator needs from persistence.
pub trait Store: OrderStore + ProductStore + UnitOfWork {}

impl<T> Store for T where T: OrderStore + ProductStore + UnitOfWork + ?Sized {}

impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn save(&self, order: Order) -> Result<Order, StoreError> {
        (**self).save(order)
    }

    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).find_by_id(id)
    }

    fn find_by_customer_id(&self, customer_id: CustomerId) -> Result<Vec<Order>, StoreError> {
        (**self).find_by_customer_id(customer_id)
    }

    fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError> {
        (**self).find_by_status(status)
    }

    fn find_all(&self) -> Result<Vec<Order>, StoreError> {
        (**self).find_all()
    }
}

impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).find_product(id)
    }

    fn save_product(&self, product: Product) -> Result<Product, StoreError> {
        (**self).save_product(product)
    }

    fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products()
    }

    fn find_available(&self, min_quantity: u32) -> Result<Vec<Product>, StoreError> {
        (**self).find_available(min_quantity)
    }
}

impl<S> UnitOfWork for Arc<S>
where
    S: UnitOfWork + ?Sized,
{
    fn commit(&self, changes: ChangeSet) -> Result<Committed, StoreError> {
        (**self).commit(changes)
    }
}
