//! In-memory adapter for defect lifecycle tests.

mod query;
mod store;

pub use store::InMemoryDefectStore;
