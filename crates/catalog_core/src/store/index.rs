//! Copy-on-write ordered index.
//!
//! # Responsibility
//! - Map index keys to the set of rows registered under them.
//! - Share structure between snapshot versions so a writer only copies the
//!   parts it touches.
//!
//! # Invariants
//! - Keys with an empty row set are removed, never kept around.
//! - Cloning an index is O(1); the first write after a clone copies the key
//!   map once and then copies only the row sets of touched keys.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Reference to a stored row: the row's primary key.
pub type RowRef = Arc<str>;

type RowSet = BTreeSet<RowRef>;

/// Persistent ordered map from index key to row references.
#[derive(Debug, Clone, Default)]
pub struct OrderedIndex {
    entries: Arc<BTreeMap<String, Arc<RowSet>>>,
}

impl OrderedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rows registered under `key`, or an empty set.
    pub fn lookup(&self, key: &str) -> BTreeSet<RowRef> {
        self.refs(key).cloned().unwrap_or_default()
    }

    /// Borrows the row set registered under `key`, if any.
    pub fn refs(&self, key: &str) -> Option<&BTreeSet<RowRef>> {
        self.entries.get(key).map(|set| set.as_ref())
    }

    /// Returns the smallest row reference registered under `key`.
    pub fn first(&self, key: &str) -> Option<&RowRef> {
        self.refs(key).and_then(|set| set.iter().next())
    }

    pub fn contains(&self, key: &str, row: &str) -> bool {
        self.refs(key).is_some_and(|set| set.contains(row))
    }

    /// Registers `row` under `key`. Returns `false` when already present.
    pub fn insert(&mut self, key: String, row: RowRef) -> bool {
        if self.contains(&key, &row) {
            return false;
        }
        let entries = Arc::make_mut(&mut self.entries);
        let set = entries.entry(key).or_default();
        Arc::make_mut(set).insert(row)
    }

    /// Unregisters `row` from `key`. Returns `false` when it was not there.
    pub fn remove(&mut self, key: &str, row: &str) -> bool {
        if !self.contains(key, row) {
            return false;
        }
        let entries = Arc::make_mut(&mut self.entries);
        let now_empty = match entries.get_mut(key) {
            Some(set) => {
                let set = Arc::make_mut(set);
                set.remove(row);
                set.is_empty()
            }
            None => false,
        };
        if now_empty {
            entries.remove(key);
        }
        true
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Whether both indexes still point at the same key map.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::{OrderedIndex, RowRef};
    use std::sync::Arc;

    fn row(value: &str) -> RowRef {
        Arc::from(value)
    }

    #[test]
    fn lookup_of_missing_key_is_empty() {
        let index = OrderedIndex::new();
        assert!(index.lookup("nothing").is_empty());
        assert!(index.first("nothing").is_none());
    }

    #[test]
    fn insert_collects_rows_per_key() {
        let mut index = OrderedIndex::new();
        assert!(index.insert("acme".to_string(), row("r2")));
        assert!(index.insert("acme".to_string(), row("r1")));
        assert!(!index.insert("acme".to_string(), row("r1")));

        let rows = index.lookup("acme");
        assert_eq!(rows.len(), 2);
        assert_eq!(index.first("acme").map(|r| r.as_ref()), Some("r1"));
    }

    #[test]
    fn remove_drops_empty_keys() {
        let mut index = OrderedIndex::new();
        index.insert("acme".to_string(), row("r1"));
        assert!(index.remove("acme", "r1"));
        assert!(!index.remove("acme", "r1"));
        assert!(index.is_empty());
    }

    #[test]
    fn clone_is_isolated_from_later_writes() {
        let mut writer = OrderedIndex::new();
        writer.insert("acme".to_string(), row("r1"));
        let published = writer.clone();
        assert!(writer.shares_storage_with(&published));

        writer.insert("acme".to_string(), row("r2"));
        writer.insert("globex".to_string(), row("r3"));
        writer.remove("acme", "r1");

        assert!(!writer.shares_storage_with(&published));
        assert_eq!(published.lookup("acme").len(), 1);
        assert!(published.contains("acme", "r1"));
        assert!(published.lookup("globex").is_empty());
        assert_eq!(writer.keys().collect::<Vec<_>>(), vec!["acme", "globex"]);
    }

    #[test]
    fn untouched_key_sets_stay_shared() {
        let mut writer = OrderedIndex::new();
        writer.insert("acme".to_string(), row("r1"));
        writer.insert("globex".to_string(), row("r2"));
        let published = writer.clone();

        writer.insert("acme".to_string(), row("r3"));

        let before = published.entries.get("globex").expect("globex set");
        let after = writer.entries.get("globex").expect("globex set");
        assert!(Arc::ptr_eq(before, after));

        let before = published.entries.get("acme").expect("acme set");
        let after = writer.entries.get("acme").expect("acme set");
        assert!(!Arc::ptr_eq(before, after));
    }
}
