//! Table: ordered, copy-on-write key space
//!
//! Rows are kept in an `im::OrdMap`, so cloning a table is O(1) and a clone
//! shares every untouched node with its source. Mutating a clone only copies
//! the path to the changed row. This is what lets a write transaction work on
//! a private copy while readers keep iterating the published one.

use std::ops::Bound;

use im::OrdMap;

/// Ordered table of rows keyed by string
#[derive(Debug, Clone)]
pub struct Table<V: Clone> {
    rows: OrdMap<String, V>,
}

impl<V: Clone> Table<V> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            rows: OrdMap::new(),
        }
    }

    /// Look up a row by exact key
    #[inline]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.rows.get(key)
    }

    /// Check if a row exists
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    /// Insert or replace a row, returning the previous one
    pub fn insert(&mut self, key: String, row: V) -> Option<V> {
        self.rows.insert(key, row)
    }

    /// Remove a row, returning it if present
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.rows.remove(key)
    }

    /// Rows whose key starts with `prefix`, in key order
    ///
    /// An empty prefix yields the whole table.
    pub fn scan_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a String, &'a V)> + 'a {
        self.rows
            .range::<_, str>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
    }

    /// Every row, in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> + '_ {
        self.rows.iter()
    }

    /// Remove every row matching `predicate`, returning how many were removed
    pub fn retain<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&String, &V) -> bool,
    {
        let doomed: Vec<String> = self
            .rows
            .iter()
            .filter(|(k, v)| !predicate(k, v))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            self.rows.remove(key.as_str());
        }
        doomed.len()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<V: Clone> Default for Table<V> {
    fn default() -> Self {
        Self::new()
    }
}
