//! Tables: one immutable root version of the whole state
//!
//! Every table plus the per-table index watermarks live in one value so a
//! single pointer swap publishes all of a transaction's changes at once.
//!
//! # Watermarks
//!
//! The `index` table maps a table name to the highest log index ever applied
//! to that table. Watermarks only move forward: `bump_index` keeps the
//! maximum of the stored and the supplied value.

use coordkv_core::{DirEntry, Session, Tombstone};

use crate::table::Table;

/// Root version of every table
#[derive(Debug, Clone, Default)]
pub struct Tables {
    /// Live key/value entries
    pub kvs: Table<DirEntry>,
    /// Tombstone graveyard
    pub tombstones: Table<Tombstone>,
    /// Sessions referenced by locks
    pub sessions: Table<Session>,
    index: Table<u64>,
}

impl Tables {
    /// Create an empty root version
    pub fn new() -> Self {
        Self::default()
    }

    /// Watermark of one table (0 if never written)
    pub fn index(&self, table: &str) -> u64 {
        self.index.get(table).copied().unwrap_or(0)
    }

    /// Highest watermark among several tables
    pub fn max_index(&self, tables: &[&str]) -> u64 {
        tables.iter().map(|t| self.index(t)).max().unwrap_or(0)
    }

    /// Advance a table's watermark to at least `idx`
    pub fn bump_index(&mut self, table: &str, idx: u64) {
        if idx > self.index(table) {
            self.index.insert(table.to_string(), idx);
        }
    }

    /// Every (table, watermark) pair, ordered by table name
    pub fn indexes(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.index.iter().map(|(t, i)| (t.as_str(), *i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordkv_core::{TABLE_KVS, TABLE_TOMBSTONES};

    #[test]
    fn test_unwritten_index_is_zero() {
        let t = Tables::new();
        assert_eq!(t.index(TABLE_KVS), 0);
        assert_eq!(t.max_index(&[TABLE_KVS, TABLE_TOMBSTONES]), 0);
        assert_eq!(t.max_index(&[]), 0);
    }

    #[test]
    fn test_bump_index_never_goes_backwards() {
        let mut t = Tables::new();
        t.bump_index(TABLE_KVS, 10);
        t.bump_index(TABLE_KVS, 4);
        assert_eq!(t.index(TABLE_KVS), 10);
        t.bump_index(TABLE_KVS, 11);
        assert_eq!(t.index(TABLE_KVS), 11);
    }

    #[test]
    fn test_max_index_across_tables() {
        let mut t = Tables::new();
        t.bump_index(TABLE_KVS, 3);
        t.bump_index(TABLE_TOMBSTONES, 8);
        assert_eq!(t.max_index(&[TABLE_KVS, TABLE_TOMBSTONES]), 8);
        assert_eq!(t.max_index(&[TABLE_KVS]), 3);

        let all: Vec<(&str, u64)> = t.indexes().collect();
        assert_eq!(all, vec![(TABLE_KVS, 3), (TABLE_TOMBSTONES, 8)]);
    }

    #[test]
    fn test_clone_shares_nothing_observable() {
        let mut base = Tables::new();
        base.kvs.insert("a".into(), DirEntry::new("a", b"1".to_vec()));
        let mut next = base.clone();
        next.kvs.remove("a");
        next.bump_index(TABLE_KVS, 5);

        assert!(base.kvs.contains("a"));
        assert_eq!(base.index(TABLE_KVS), 0);
        assert!(!next.kvs.contains("a"));
    }
}
