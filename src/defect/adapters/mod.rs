//! Adapter implementations of the defect ports.
//!
//! - [`memory::InMemoryDefectStore`]: thread-safe in-memory storage with
//!   snapshot transactions, for tests and demos
//! - [`postgres::PostgresDefectStore`]: `PostgreSQL` persistence using
//!   Diesel ORM

pub mod memory;
pub mod postgres;
