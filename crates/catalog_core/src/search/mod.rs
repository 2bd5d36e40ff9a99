//! Multi-field search over the catalog tables.
//!
//! # Responsibility
//! - Project a filter template into explicit field predicates.
//! - Resolve predicates through table indexes and combine them with AND
//!   semantics.
//!
//! # See also
//! - `repo::metadata_repo` for the transaction each query runs in.

pub mod query;
