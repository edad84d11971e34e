//! Transactional unit-of-work port over the entity store.
//!
//! Every mutating engine operation runs inside
//! [`DefectStore::transaction`]. The closure receives a
//! [`StoreTransaction`] handle; returning `Ok` commits every write made
//! through the handle, returning `Err` rolls all of them back.

use crate::defect::domain::{
    ActivityEntry, Assignment, Contractor, ContractorId, Defect, DefectId, NewActivityEntry, User,
    UserId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Reads and writes available inside one open transaction.
pub trait StoreTransaction {
    /// Reads a defect without locking it. Soft-deleted defects are returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying store fails.
    fn find_defect(&mut self, id: DefectId) -> StoreResult<Option<Defect>>;

    /// Reads a defect and holds a row lock on it until the transaction ends.
    ///
    /// Concurrent transactions locking the same defect are serialized.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying store fails.
    fn lock_defect(&mut self, id: DefectId) -> StoreResult<Option<Defect>>;

    /// Reads a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying store fails.
    fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>>;

    /// Reads a contractor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying store fails.
    fn find_contractor(&mut self, id: ContractorId) -> StoreResult<Option<Contractor>>;

    /// Reads the current assignment of a defect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying store fails.
    fn current_assignment(&mut self, defect_id: DefectId) -> StoreResult<Option<Assignment>>;

    /// Deletes any assignment of a defect and returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying store fails.
    fn delete_assignment(&mut self, defect_id: DefectId) -> StoreResult<usize>;

    /// Inserts an assignment. A defect must have no assignment beforehand.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying store fails or rejects the
    /// row.
    fn insert_assignment(&mut self, assignment: &Assignment) -> StoreResult<()>;

    /// Persists a modified defect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying store fails.
    fn update_defect(&mut self, defect: &Defect) -> StoreResult<()>;

    /// Appends one activity entry and returns its stored form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying store fails.
    fn append_activity(&mut self, entry: &NewActivityEntry) -> StoreResult<ActivityEntry>;
}

/// Entity store contract.
#[async_trait]
pub trait DefectStore: Send + Sync {
    /// Runs `work` in one transaction.
    ///
    /// Commits when `work` returns `Ok`; rolls back every write otherwise.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or a [`StoreError`] converted
    /// into `E` when the transaction cannot be opened or committed.
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static;

    /// Returns a defect's activity trail, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying store fails.
    async fn activity_for(&self, defect_id: DefectId) -> StoreResult<Vec<ActivityEntry>>;
}

/// Errors returned by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),

    /// A write violated a store constraint.
    #[error("constraint violated: {0}")]
    Constraint(String),
}

impl StoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Creates a constraint violation error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint(message.into())
    }
}
