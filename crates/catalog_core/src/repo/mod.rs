//! Repository layer contracts and the in-memory implementation.
//!
//! # Responsibility
//! - Define the use-case oriented data access contract for metadata.
//! - Keep table layout and transaction handling out of the service layer.
//!
//! # Invariants
//! - Every repository operation runs inside exactly one transaction.
//! - Repository APIs return semantic errors (`NotFound`,
//!   `InvalidQueryField`) in addition to store errors.

pub mod catalog_tables;
pub mod metadata_repo;
