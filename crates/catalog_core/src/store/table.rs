//! Schema-driven table over copy-on-write indexes.
//!
//! # Responsibility
//! - Store rows by primary key and keep every declared index in sync on
//!   insert, replace and delete.
//! - Enforce unique and required indexes before any index is touched.
//!
//! # Invariants
//! - A failed insert leaves the table exactly as it was.
//! - Inserting a row whose primary key already exists replaces that row.
//! - Lookups never fail on a missing key, only on an unknown index name.

use super::index::{OrderedIndex, RowRef};
use super::schema::{IndexSchema, TableSchema};
use super::{StoreError, StoreResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One table inside a snapshot. Cloning shares all storage.
pub struct Table<T> {
    schema: Arc<TableSchema<T>>,
    rows: Arc<BTreeMap<RowRef, Arc<T>>>,
    primary: OrderedIndex,
    indexes: Vec<OrderedIndex>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            rows: Arc::clone(&self.rows),
            primary: self.primary.clone(),
            indexes: self.indexes.clone(),
        }
    }
}

impl<T> Table<T> {
    /// Creates an empty table for a validated schema.
    pub fn new(schema: TableSchema<T>) -> StoreResult<Self> {
        schema.validate()?;
        let indexes = vec![OrderedIndex::new(); schema.indexes.len()];
        Ok(Self {
            schema: Arc::new(schema),
            rows: Arc::new(BTreeMap::new()),
            primary: OrderedIndex::new(),
            indexes,
        })
    }

    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates all rows in primary key order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.rows.values()
    }

    /// Fetches a row by its stored primary key.
    pub fn row(&self, row_ref: &str) -> Option<Arc<T>> {
        self.rows.get(row_ref).cloned()
    }

    /// Returns the row references registered under `key` on `index`.
    pub fn lookup(&self, index: &str, key: &str) -> StoreResult<BTreeSet<RowRef>> {
        let (schema, ordered) = self.resolve(index)?;
        Ok(ordered.lookup(&schema.normalize_key(key)))
    }

    /// Returns one row registered under `key` on `index`, if any.
    pub fn first(&self, index: &str, key: &str) -> StoreResult<Option<Arc<T>>> {
        let (schema, ordered) = self.resolve(index)?;
        Ok(ordered
            .first(&schema.normalize_key(key))
            .and_then(|row_ref| self.row(row_ref)))
    }

    /// Returns every row registered under `key` on `index`.
    pub fn get(&self, index: &str, key: &str) -> StoreResult<impl Iterator<Item = Arc<T>> + '_> {
        let refs = self.lookup(index, key)?;
        Ok(refs.into_iter().filter_map(move |row_ref| self.row(&row_ref)))
    }

    /// Inserts `row`, replacing a stored row with the same primary key.
    ///
    /// # Errors
    /// - `MissingIndexValue` when the primary key or a required index is empty.
    /// - `ConstraintViolation` when a unique index holds a different row.
    pub fn insert(&mut self, row: T) -> StoreResult<Arc<T>> {
        let schema = Arc::clone(&self.schema);
        let row_ref = primary_ref(&schema, &row)?;

        // Why: checks run before the first index write so a rejected row
        // never needs to be rolled back out of half the indexes.
        for (position, index_schema) in schema.indexes.iter().enumerate() {
            if !index_schema.unique && !index_schema.required {
                continue;
            }
            let keys = index_schema.keys(&row);
            if index_schema.required && keys.is_empty() {
                return Err(StoreError::MissingIndexValue {
                    table: schema.name,
                    index: index_schema.name,
                });
            }
            if !index_schema.unique {
                continue;
            }
            for key in keys {
                let collides = self.indexes[position]
                    .refs(&key)
                    .is_some_and(|set| set.iter().any(|existing| *existing != row_ref));
                if collides {
                    return Err(StoreError::ConstraintViolation {
                        table: schema.name,
                        index: index_schema.name,
                        key,
                    });
                }
            }
        }

        if let Some(previous) = self.rows.get(&row_ref).cloned() {
            self.unindex(&schema, &row_ref, &previous);
        }

        self.primary.insert(row_ref.to_string(), Arc::clone(&row_ref));
        for (position, index_schema) in schema.indexes.iter().enumerate() {
            for key in index_schema.keys(&row) {
                self.indexes[position].insert(key, Arc::clone(&row_ref));
            }
        }

        let row = Arc::new(row);
        Arc::make_mut(&mut self.rows).insert(row_ref, Arc::clone(&row));
        Ok(row)
    }

    /// Removes the row stored under primary key `key` from every index.
    pub fn delete(&mut self, key: &str) -> StoreResult<Arc<T>> {
        let schema = Arc::clone(&self.schema);
        let normalized = schema.primary.normalize_key(key);
        let Some((row_ref, row)) = self
            .rows
            .get_key_value(normalized.as_str())
            .map(|(row_ref, row)| (Arc::clone(row_ref), Arc::clone(row)))
        else {
            return Err(StoreError::RowNotFound {
                table: schema.name,
                key: normalized,
            });
        };

        self.unindex(&schema, &row_ref, &row);
        Arc::make_mut(&mut self.rows).remove(&row_ref);
        Ok(row)
    }

    fn unindex(&mut self, schema: &TableSchema<T>, row_ref: &RowRef, row: &T) {
        self.primary.remove(row_ref, row_ref);
        for (position, index_schema) in schema.indexes.iter().enumerate() {
            for key in index_schema.keys(row) {
                self.indexes[position].remove(&key, row_ref);
            }
        }
    }

    fn resolve(&self, index: &str) -> StoreResult<(&IndexSchema<T>, &OrderedIndex)> {
        if index == self.schema.primary.name {
            return Ok((&self.schema.primary, &self.primary));
        }
        self.schema
            .position(index)
            .map(|position| (&self.schema.indexes[position], &self.indexes[position]))
            .ok_or_else(|| StoreError::UnknownIndex {
                table: self.schema.name,
                index: index.to_string(),
            })
    }
}

fn primary_ref<T>(schema: &TableSchema<T>, row: &T) -> StoreResult<RowRef> {
    schema
        .primary
        .keys(row)
        .into_iter()
        .next()
        .map(RowRef::from)
        .ok_or(StoreError::MissingIndexValue {
            table: schema.name,
            index: schema.primary.name,
        })
}
