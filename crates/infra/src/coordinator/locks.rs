//! In-process exclusive locks keyed by order id.
//!
//! The coordinator holds an order's lock from load to commit, so two
//! operations on one order never interleave. An external capability is
//! therefore called at most once per transition. Operations on different
//! orders do not contend.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use ordermgmt_core::OrderId;

#[derive(Debug, Default)]
pub(crate) struct OrderLocks {
    held: Mutex<HashSet<OrderId>>,
    released: Condvar,
}

/// Releases the order's lock on drop.
#[derive(Debug)]
pub(crate) struct OrderLockGuard<'a> {
    locks: &'a OrderLocks,
    order_id: OrderId,
}

impl OrderLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Block until no other caller holds `order_id`, then take it.
    pub(crate) fn acquire(&self, order_id: OrderId) -> OrderLockGuard<'_> {
        let mut held = self.held_set();
        while held.contains(&order_id) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(order_id);

        OrderLockGuard {
            locks: self,
            order_id,
        }
    }

    // The set only records membership, so a panic elsewhere cannot leave it
    // inconsistent.
    fn held_set(&self) -> MutexGuard<'_, HashSet<OrderId>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn is_held(&self, order_id: OrderId) -> bool {
        self.held_set().contains(&order_id)
    }
}

impl Drop for OrderLockGuard<'_> {
    fn drop(&mut self) {
        self.locks.held_set().remove(&self.order_id);
        self.locks.released.notify_all();
    }
}
