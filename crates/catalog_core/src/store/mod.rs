//! In-memory transactional multi-index store.
//!
//! # Responsibility
//! - Hold schema-driven tables whose rows are reachable through a unique
//!   primary index and any number of secondary indexes.
//! - Publish immutable snapshots; readers pin one, a single writer builds
//!   the next one privately and swaps it in on commit.
//!
//! # Invariants
//! - A published snapshot is never mutated; mutation only happens on a
//!   write transaction's working copy.
//! - Commit is a single atomic pointer swap.
//! - At most one write transaction is open at a time.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod index;
mod schema;
mod table;
mod txn;

pub use index::{OrderedIndex, RowRef};
pub use schema::{IndexSchema, Indexer, TableSchema};
pub use table::Table;
pub use txn::{MemStore, ReadTxn, TxnId, TxnState, WriteTxn};

pub type StoreResult<T> = Result<T, StoreError>;

/// Table-level failures raised while reading or mutating a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique index already holds a different row under `key`.
    ConstraintViolation {
        table: &'static str,
        index: &'static str,
        key: String,
    },
    /// The table declares no index named `index`.
    UnknownIndex { table: &'static str, index: String },
    /// A row produced no value for an index that requires one.
    MissingIndexValue {
        table: &'static str,
        index: &'static str,
    },
    /// No row is stored under the primary key `key`.
    RowNotFound { table: &'static str, key: String },
    /// The table schema itself is inconsistent.
    InvalidSchema {
        table: &'static str,
        message: String,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConstraintViolation { table, index, key } => write!(
                f,
                "unique constraint violated on {table}.{index} for key `{key}`"
            ),
            Self::UnknownIndex { table, index } => {
                write!(f, "table `{table}` has no index named `{index}`")
            }
            Self::MissingIndexValue { table, index } => {
                write!(f, "missing value for required index {table}.{index}")
            }
            Self::RowNotFound { table, key } => {
                write!(f, "no row in `{table}` for primary key `{key}`")
            }
            Self::InvalidSchema { table, message } => {
                write!(f, "invalid schema for table `{table}`: {message}")
            }
        }
    }
}

impl Error for StoreError {}
