//! Tombstone graveyard
//!
//! A delete must stay visible to consistency tracking: a blocking read on a
//! prefix has to see the delete as an index advance even though the key is
//! gone. The graveyard keeps one tombstone per deleted key until it is
//! reaped, and maintains its own `tombstones` watermark.
//!
//! All functions operate on a transaction's tables, so graveyard changes
//! commit or abort together with the table changes that caused them.

use coordkv_core::{Tombstone, TABLE_TOMBSTONES};
use coordkv_storage::Tables;

/// Record that `key` was deleted at `idx`
pub fn insert(tables: &mut Tables, key: &str, idx: u64) {
    tables.tombstones.insert(
        key.to_string(),
        Tombstone {
            key: key.to_string(),
            index: idx,
        },
    );
    tables.bump_index(TABLE_TOMBSTONES, idx);
}

/// Drop the tombstone for a key that is live again
///
/// The graveyard watermark is left where it is.
pub fn remove(tables: &mut Tables, key: &str) -> Option<Tombstone> {
    tables.tombstones.remove(key)
}

/// Highest tombstone index under `prefix` (0 if none)
pub fn max_index(tables: &Tables, prefix: &str) -> u64 {
    tables
        .tombstones
        .scan_prefix(prefix)
        .map(|(_, stone)| stone.index)
        .max()
        .unwrap_or(0)
}

/// Every tombstone, in key order
pub fn dump(tables: &Tables) -> impl Iterator<Item = &Tombstone> + '_ {
    tables.tombstones.iter().map(|(_, stone)| stone)
}

/// Insert a tombstone taken from a snapshot
///
/// A key is never both live and deleted. If the key has a live entry the
/// newer record wins by index, the live entry on a tie. Returns whether the
/// tombstone was kept. Advances only the graveyard's own watermark.
pub fn restore(tables: &mut Tables, stone: Tombstone) -> bool {
    tables.bump_index(TABLE_TOMBSTONES, stone.index);
    match tables.kvs.get(&stone.key) {
        Some(live) if live.modify_index >= stone.index => return false,
        Some(_) => {
            tables.kvs.remove(&stone.key);
        }
        None => {}
    }
    tables.tombstones.insert(stone.key.clone(), stone);
    true
}

/// Delete every tombstone with `index <= idx`, returning how many went
pub fn reap(tables: &mut Tables, idx: u64) -> usize {
    tables.tombstones.retain(|_, stone| stone.index > idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordkv_core::DirEntry;

    #[test]
    fn test_insert_tracks_watermark() {
        let mut t = Tables::new();
        insert(&mut t, "foo/a", 5);
        insert(&mut t, "foo/b", 3);
        assert_eq!(t.index(TABLE_TOMBSTONES), 5);
        assert_eq!(t.tombstones.len(), 2);
    }

    #[test]
    fn test_reinsert_overwrites() {
        let mut t = Tables::new();
        insert(&mut t, "k", 2);
        insert(&mut t, "k", 9);
        assert_eq!(t.tombstones.len(), 1);
        assert_eq!(t.tombstones.get("k").unwrap().index, 9);
    }

    #[test]
    fn test_max_index_by_prefix() {
        let mut t = Tables::new();
        insert(&mut t, "foo/a", 5);
        insert(&mut t, "foo/b", 7);
        insert(&mut t, "bar/a", 9);
        assert_eq!(max_index(&t, "foo/"), 7);
        assert_eq!(max_index(&t, "bar/"), 9);
        assert_eq!(max_index(&t, "baz/"), 0);
        assert_eq!(max_index(&t, ""), 9);
    }

    #[test]
    fn test_dump_is_ordered() {
        let mut t = Tables::new();
        insert(&mut t, "c", 1);
        insert(&mut t, "a", 2);
        insert(&mut t, "b", 3);
        let keys: Vec<&str> = dump(&t).map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reap_removes_at_or_below_threshold() {
        let mut t = Tables::new();
        insert(&mut t, "a", 4);
        insert(&mut t, "b", 5);
        insert(&mut t, "c", 6);
        assert_eq!(reap(&mut t, 5), 2);
        let left: Vec<u64> = dump(&t).map(|s| s.index).collect();
        assert_eq!(left, vec![6]);
        // Watermark is not rolled back
        assert_eq!(t.index(TABLE_TOMBSTONES), 6);
    }

    #[test]
    fn test_remove_keeps_watermark() {
        let mut t = Tables::new();
        insert(&mut t, "a", 4);
        assert!(remove(&mut t, "a").is_some());
        assert!(remove(&mut t, "a").is_none());
        assert_eq!(t.index(TABLE_TOMBSTONES), 4);
    }

    fn stone(key: &str, index: u64) -> Tombstone {
        Tombstone {
            key: key.into(),
            index,
        }
    }

    #[test]
    fn test_restore_resolves_overlap_by_index() {
        let mut t = Tables::new();
        let mut older = DirEntry::new("old", Vec::new());
        older.modify_index = 3;
        let mut newer = DirEntry::new("new", Vec::new());
        newer.modify_index = 9;
        let mut tied = DirEntry::new("tie", Vec::new());
        tied.modify_index = 5;
        for entry in [older, newer, tied] {
            t.kvs.insert(entry.key.clone(), entry);
        }

        assert!(restore(&mut t, stone("old", 4)));
        assert!(!restore(&mut t, stone("new", 8)));
        assert!(!restore(&mut t, stone("tie", 5)));

        assert!(!t.kvs.contains("old"));
        assert!(t.kvs.contains("new"));
        assert!(t.kvs.contains("tie"));
        let kept: Vec<&str> = dump(&t).map(|s| s.key.as_str()).collect();
        assert_eq!(kept, vec!["old"]);
        // Dropped tombstones still move the watermark
        assert_eq!(t.index(TABLE_TOMBSTONES), 8);
    }

    #[test]
    fn test_restore_advances_graveyard_watermark() {
        let mut t = Tables::new();
        assert!(restore(&mut t, stone("a", 12)));
        assert_eq!(t.index(TABLE_TOMBSTONES), 12);
        assert_eq!(max_index(&t, "a"), 12);
    }
}
