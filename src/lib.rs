//! Snaglist: construction defect lifecycle and assignment tracking.
//!
//! This crate provides the transactional core of a site defect tracker:
//! guarded status transitions, routing of defects to users and contractors
//! (singly or in bulk), an append-only activity trail, and read-only
//! listing and dashboard queries.
//!
//! # Architecture
//!
//! Snaglist follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the entity store
//! - **Adapters**: In-memory and `PostgreSQL` implementations of the ports
//!
//! # Modules
//!
//! - [`defect`]: Defect lifecycle, assignment, and queries
//! - [`config`]: Tracker configuration

pub mod config;
pub mod defect;
