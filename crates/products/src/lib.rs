//! Product catalog / stock ledger domain module.
//!
//! This crate contains the rules for a product's available quantity,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod product;

pub use product::Product;
