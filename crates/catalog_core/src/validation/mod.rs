//! Inbound validation and sanitization of catalog records.
//!
//! # Responsibility
//! - Check required fields before records reach the repository.
//! - Normalize URLs and email addresses in place.
//! - Report every offending field at once.
//!
//! # Invariants
//! - A validator either returns `Ok(())` after sanitizing, or an aggregated
//!   error; callers must not persist on error.

mod errors;
pub mod validator;

pub use errors::{AggregatedValidationError, ValidationError};
