//! Table and index declarations.
//!
//! # Responsibility
//! - Describe how a row type is projected into index keys.
//! - Keep key normalization (lower-casing) in one place for writes and
//!   lookups alike.
//!
//! # Invariants
//! - The primary index is always unique and required.
//! - Index names are unique within a table.
//! - Empty values are never turned into index keys.

use super::{StoreError, StoreResult};
use std::collections::BTreeSet;

/// Projection of a row into the values an index is keyed by.
pub enum Indexer<T> {
    /// One value per row.
    Field(fn(&T) -> String),
    /// One key per element of a collection.
    Strings(fn(&T) -> Vec<String>),
}

/// Declaration of one index on a table.
pub struct IndexSchema<T> {
    pub name: &'static str,
    pub unique: bool,
    /// Normalize stored keys and lookup keys to lower-case.
    pub lowercase: bool,
    /// A row must produce at least one non-empty key.
    pub required: bool,
    pub indexer: Indexer<T>,
}

impl<T> IndexSchema<T> {
    /// Non-unique, case-sensitive index over a single-valued field.
    pub fn field(name: &'static str, extract: fn(&T) -> String) -> Self {
        Self {
            name,
            unique: false,
            lowercase: false,
            required: false,
            indexer: Indexer::Field(extract),
        }
    }

    /// Non-unique, case-sensitive index over a collection field.
    pub fn strings(name: &'static str, extract: fn(&T) -> Vec<String>) -> Self {
        Self {
            name,
            unique: false,
            lowercase: false,
            required: false,
            indexer: Indexer::Strings(extract),
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    /// Normalizes a raw value into the form stored in the index.
    pub fn normalize_key(&self, raw: &str) -> String {
        if self.lowercase {
            raw.to_lowercase()
        } else {
            raw.to_string()
        }
    }

    /// Computes the distinct, non-empty keys `row` is registered under.
    pub fn keys(&self, row: &T) -> Vec<String> {
        let raw = match &self.indexer {
            Indexer::Field(extract) => vec![extract(row)],
            Indexer::Strings(extract) => extract(row),
        };

        let mut seen = BTreeSet::new();
        raw.iter()
            .filter(|value| !value.is_empty())
            .map(|value| self.normalize_key(value))
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }
}

/// Declaration of a table: its primary index plus secondary indexes.
pub struct TableSchema<T> {
    pub name: &'static str,
    pub primary: IndexSchema<T>,
    pub indexes: Vec<IndexSchema<T>>,
}

impl<T> TableSchema<T> {
    /// Creates a schema; the primary index is forced unique and required.
    pub fn new(name: &'static str, primary: IndexSchema<T>) -> Self {
        Self {
            name,
            primary: primary.unique().required(),
            indexes: Vec::new(),
        }
    }

    pub fn with_index(mut self, index: IndexSchema<T>) -> Self {
        self.indexes.push(index);
        self
    }

    /// Position of a secondary index by name.
    pub fn position(&self, index: &str) -> Option<usize> {
        self.indexes.iter().position(|schema| schema.name == index)
    }

    /// Checks that the declaration can back a table.
    pub fn validate(&self) -> StoreResult<()> {
        if !matches!(self.primary.indexer, Indexer::Field(_)) {
            return Err(StoreError::InvalidSchema {
                table: self.name,
                message: format!(
                    "primary index `{}` must be single-valued",
                    self.primary.name
                ),
            });
        }

        let mut names = BTreeSet::from([self.primary.name]);
        for index in &self.indexes {
            if index.name.is_empty() {
                return Err(StoreError::InvalidSchema {
                    table: self.name,
                    message: "index name must not be empty".to_string(),
                });
            }
            if !names.insert(index.name) {
                return Err(StoreError::InvalidSchema {
                    table: self.name,
                    message: format!("duplicate index name `{}`", index.name),
                });
            }
        }

        Ok(())
    }
}
