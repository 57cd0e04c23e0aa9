//! Order and product persistence boundary.
//!
//! Orders and products are stored as versioned snapshots. A coordinated
//! operation stages every aggregate it touched in a [`ChangeSet`] and commits
//! them in one call; the store checks each staged version against the stored
//! one and applies all writes or none.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use r#trait::{
    ChangeSet, Committed, OrderStore, ProductStore, Store, StoreError, UnitOfWork,
};
