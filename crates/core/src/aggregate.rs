//! Aggregate root trait for state-based domain models.

/// Aggregate root marker + minimal interface.
///
/// Aggregates own their invariants and are mutated only through named
/// operations. The store uses `version()` for optimistic concurrency.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    ///
    /// `None` until the aggregate has been persisted for the first time
    /// (identity is assigned by the store).
    fn id(&self) -> Option<&Self::Id>;

    /// Revision of the persisted state this instance was loaded from.
    ///
    /// `0` means "never persisted". The store increments it on every commit.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation: the revision a staged aggregate was
/// loaded at. A commit only goes through if the stored revision still matches.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpectedVersion(pub u64);

impl ExpectedVersion {
    pub fn of<A: AggregateRoot>(aggregate: &A) -> Self {
        ExpectedVersion(aggregate.version())
    }

    pub fn matches(self, actual: u64) -> bool {
        self.0 == actual
    }
}
