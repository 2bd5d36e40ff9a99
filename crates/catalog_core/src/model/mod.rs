//! Catalog domain model.
//!
//! # Responsibility
//! - Define the metadata record and maintainer shapes shared by every layer.
//! - Keep identifiers typed so repository signatures stay explicit.
//!
//! # Invariants
//! - Every stored record is identified by a stable `MetadataId`.
//! - Records are never hard-deleted through the public API.

pub mod metadata;
