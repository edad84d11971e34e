//! `PostgreSQL` adapters for defect persistence.
//!
//! Schema migrations live in the crate's `migrations/` directory.

mod conversion;
mod models;
mod query;
mod schema;
mod store;

pub use store::{DefectPgPool, PostgresDefectStore};
