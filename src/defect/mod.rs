//! Defect lifecycle and assignment tracking.
//!
//! Defects move through a configurable status lifecycle and are routed to a
//! responsible user and contracting company. Every mutation runs in one
//! store transaction together with exactly one activity-log entry, so state
//! and audit trail are never observed out of sync. The module follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
