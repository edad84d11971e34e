//! Port contracts for defect persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by defect services.

pub mod query;
pub mod store;

pub use query::{DefectQueryRepository, ListingSlice};
pub use store::{DefectStore, StoreError, StoreResult, StoreTransaction};
