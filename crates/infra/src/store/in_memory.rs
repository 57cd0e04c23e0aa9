use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use ordermgmt_core::{AggregateRoot, CustomerId, ExpectedVersion, OrderId, ProductId};
use ordermgmt_orders::{Order, OrderStatus};
use ordermgmt_products::Product;

use super::r#trait::{ChangeSet, Committed, OrderStore, ProductStore, StoreError, UnitOfWork};

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    order_sequence: Vec<OrderId>,
    products: HashMap<ProductId, Product>,
    product_sequence: Vec<ProductId>,
}

/// In-memory order and product store.
///
/// Intended for tests/dev. One `RwLock` guards every table, so a commit is
/// validated and applied under a single write lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn orders_matching(&self, keep: impl Fn(&Order) -> bool) -> Result<Vec<Order>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .order_sequence
            .iter()
            .filter_map(|id| tables.orders.get(id))
            .filter(|order| keep(order))
            .cloned()
            .collect())
    }
}

fn check_version(
    kind: &str,
    id: impl core::fmt::Display,
    expected: ExpectedVersion,
    stored: Option<u64>,
) -> Result<(), StoreError> {
    let current = stored.unwrap_or(0);
    if !expected.matches(current) {
        return Err(StoreError::Concurrency(format!(
            "{kind} {id}: expected version {}, found {current}",
            expected.0
        )));
    }
    Ok(())
}

impl UnitOfWork for InMemoryStore {
    fn commit(&self, changes: ChangeSet) -> Result<Committed, StoreError> {
        if changes.is_empty() {
            return Ok(Committed {
                orders: vec![],
                products: vec![],
            });
        }

        let mut tables = self.write()?;

        // 1) Validate every staged aggregate before touching anything.
        let mut seen_orders = HashSet::new();
        for order in &changes.orders {
            let Some(id) = order.order_id() else {
                if order.version() != 0 {
                    return Err(StoreError::InvalidCommit(
                        "order without identity carries a version".to_string(),
                    ));
                }
                continue;
            };
            if !seen_orders.insert(id) {
                return Err(StoreError::InvalidCommit(format!("order {id} staged twice")));
            }
            let stored = tables.orders.get(&id).map(AggregateRoot::version);
            check_version("order", id, ExpectedVersion::of(order), stored)?;
        }

        let mut seen_products = HashSet::new();
        for product in &changes.products {
            let id = product.id_typed();
            if !seen_products.insert(id) {
                return Err(StoreError::InvalidCommit(format!("product {id} staged twice")));
            }
            let stored = tables.products.get(&id).map(AggregateRoot::version);
            check_version("product", id, ExpectedVersion::of(product), stored)?;
        }

        // 2) Apply.
        let mut committed_orders = Vec::with_capacity(changes.orders.len());
        for mut order in changes.orders {
            let id = match order.order_id() {
                Some(id) => id,
                None => {
                    let id = OrderId::new();
                    order
                        .assign_id(id)
                        .map_err(|e| StoreError::InvalidCommit(e.to_string()))?;
                    id
                }
            };
            order.mark_persisted(order.version() + 1);

            let mut stored = order.clone();
            stored.clear_events();
            if tables.orders.insert(id, stored).is_none() {
                tables.order_sequence.push(id);
            }
            committed_orders.push(order);
        }

        let mut committed_products = Vec::with_capacity(changes.products.len());
        for mut product in changes.products {
            let id = product.id_typed();
            product.mark_persisted(product.version() + 1);
            if tables.products.insert(id, product.clone()).is_none() {
                tables.product_sequence.push(id);
            }
            committed_products.push(product);
        }

        Ok(Committed {
            orders: committed_orders,
            products: committed_products,
        })
    }
}

impl OrderStore for InMemoryStore {
    fn save(&self, order: Order) -> Result<Order, StoreError> {
        self.commit(ChangeSet::new().with_order(order))?.into_order()
    }

    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    fn find_by_customer_id(&self, customer_id: CustomerId) -> Result<Vec<Order>, StoreError> {
        self.orders_matching(|order| order.customer_id() == customer_id)
    }

    fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError> {
        self.orders_matching(|order| order.status() == status)
    }

    fn find_all(&self) -> Result<Vec<Order>, StoreError> {
        self.orders_matching(|_| true)
    }
}

impl ProductStore for InMemoryStore {
    fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    fn save_product(&self, product: Product) -> Result<Product, StoreError> {
        let mut committed = self.commit(ChangeSet::new().with_product(product))?;
        committed
            .products
            .pop()
            .ok_or_else(|| StoreError::InvalidCommit("product was not committed".to_string()))
    }

    fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .product_sequence
            .iter()
            .filter_map(|id| tables.products.get(id))
            .cloned()
            .collect())
    }

    fn find_available(&self, min_quantity: u32) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .list_products()?
            .into_iter()
            .filter(|product| product.is_available(min_quantity))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ordermgmt_core::Money;
    use ordermgmt_orders::OrderItem;
    use rust_decimal_macros::dec;

    fn product(name: &str, stock: u32) -> Product {
        Product::new(
            ProductId::new(),
            name,
            "",
            Money::euro(dec!(10.00)).unwrap(),
            stock,
        )
        .unwrap()
    }

    fn order_for(product: &Product, customer_id: CustomerId) -> Order {
        Order::new(
            customer_id,
            vec![OrderItem::from_product(product, 1).unwrap()],
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn save_assigns_identity_and_first_version() {
        let store = InMemoryStore::new();
        let p = store.save_product(product("Widget", 5)).unwrap();
        assert_eq!(p.version(), 1);

        let saved = store.save(order_for(&p, CustomerId::new())).unwrap();
        let id = saved.order_id().expect("identity assigned");
        assert_eq!(saved.version(), 1);
        assert_eq!(store.find_by_id(id).unwrap(), Some(saved));
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = InMemoryStore::new();
        let p = store.save_product(product("Widget", 5)).unwrap();

        let mut first = p.clone();
        first.decrease(1).unwrap();
        store.save_product(first).unwrap();

        let mut stale = p;
        stale.decrease(2).unwrap();
        match store.save_product(stale) {
            Err(StoreError::Concurrency(_)) => {}
            other => panic!("Expected Concurrency error, got {other:?}"),
        }
    }

    #[test]
    fn commit_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let a = store.save_product(product("A", 5)).unwrap();
        let b = store.save_product(product("B", 5)).unwrap();

        // Make `b` stale.
        let mut newer_b = b.clone();
        newer_b.decrease(1).unwrap();
        store.save_product(newer_b).unwrap();

        let mut staged_a = a.clone();
        staged_a.decrease(3).unwrap();
        let mut staged_b = b;
        staged_b.decrease(3).unwrap();

        let result = store.commit(ChangeSet::new().with_product(staged_a).with_product(staged_b));
        assert!(matches!(result, Err(StoreError::Concurrency(_))));

        let a_now = store.find_product(a.id_typed()).unwrap().unwrap();
        assert_eq!(a_now.stock_quantity(), 5);
        assert_eq!(a_now.version(), 1);
    }

    #[test]
    fn same_aggregate_staged_twice_is_invalid() {
        let store = InMemoryStore::new();
        let p = store.save_product(product("Widget", 5)).unwrap();
        let result = store.commit(ChangeSet::new().with_product(p.clone()).with_product(p));
        assert!(matches!(result, Err(StoreError::InvalidCommit(_))));
    }

    #[test]
    fn stored_orders_hold_no_pending_events() {
        let store = InMemoryStore::new();
        let p = store.save_product(product("Widget", 5)).unwrap();
        let mut saved = store.save(order_for(&p, CustomerId::new())).unwrap();

        saved.confirm(Utc::now()).unwrap();
        let committed = store.save(saved).unwrap();
        assert_eq!(committed.pending_events().len(), 1);

        let stored = store.find_by_id(committed.order_id().unwrap()).unwrap().unwrap();
        assert!(stored.pending_events().is_empty());
        assert_eq!(stored.version(), 2);
    }

    #[test]
    fn queries_preserve_creation_order() {
        let store = InMemoryStore::new();
        let p = store.save_product(product("Widget", 5)).unwrap();
        let alice = CustomerId::new();
        let bob = CustomerId::new();

        let first = store.save(order_for(&p, alice)).unwrap();
        let second = store.save(order_for(&p, bob)).unwrap();
        let third = store.save(order_for(&p, alice)).unwrap();

        let all: Vec<_> = store.find_all().unwrap().iter().map(|o| o.order_id()).collect();
        assert_eq!(all, vec![first.order_id(), second.order_id(), third.order_id()]);

        let alices: Vec<_> = store
            .find_by_customer_id(alice)
            .unwrap()
            .iter()
            .map(|o| o.order_id())
            .collect();
        assert_eq!(alices, vec![first.order_id(), third.order_id()]);

        assert_eq!(store.find_by_status(OrderStatus::Pending).unwrap().len(), 3);
        assert!(store.find_by_status(OrderStatus::Paid).unwrap().is_empty());
    }

    #[test]
    fn find_available_filters_by_stock() {
        let store = InMemoryStore::new();
        store.save_product(product("Empty", 0)).unwrap();
        store.save_product(product("Few", 2)).unwrap();
        store.save_product(product("Many", 20)).unwrap();

        let names = |ps: Vec<Product>| ps.iter().map(|p| p.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names(store.find_available(1).unwrap()), vec!["Few", "Many"]);
        assert_eq!(names(store.find_available(10).unwrap()), vec!["Many"]);
        assert_eq!(store.list_products().unwrap().len(), 3);
    }
}
