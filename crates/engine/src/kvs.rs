//! KvStore: the replicated key/value primitive
//!
//! ## Design
//!
//! KvStore is a stateless facade over the Database. It holds no in-memory
//! state beyond an `Arc<Database>` reference.
//!
//! ## Apply Semantics
//!
//! Every mutation takes the log index of the replicated operation being
//! applied and runs in exactly one write transaction:
//!
//! ```text
//! 1. check preconditions against the transaction's view
//! 2. write entries, tombstones and watermarks
//! 3. defer the watch notification
//! 4. commit (or drop the transaction, leaving no trace)
//! ```
//!
//! Expected outcomes (CAS mismatch, lock contention, deleting a missing key)
//! are returned as `false` or as a silent no-op, never as errors.
//!
//! ## Read Indexes
//!
//! Reads return the index a blocking query should wait past. For a prefix
//! `P` it is computed as:
//!
//! ```text
//! idx    = max(watermark(kvs), watermark(tombstones))
//! lindex = max(modify_index of live entries under P)
//! P != "": lindex = max(lindex, max tombstone index under P)
//! P == "": lindex = idx
//! result = lindex if lindex != 0 else idx
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use coordkv_concurrency::WriteTxn;
use coordkv_core::{
    DirEntry, LockDelayLookup, Result, TABLE_KVS, TABLE_TOMBSTONES,
};
use coordkv_storage::Tables;

use crate::database::Database;
use crate::graveyard;

/// Replicated key/value store
///
/// # Example
///
/// ```ignore
/// use coordkv_engine::{Database, DirEntry, KvStore};
/// use std::sync::Arc;
///
/// let kv = KvStore::new(Arc::new(Database::new()));
/// kv.set(5, DirEntry::new("a", b"1".to_vec()))?;
/// let (idx, entry) = kv.get("a")?;
/// assert_eq!(idx, 5);
/// ```
#[derive(Clone)]
pub struct KvStore {
    db: Arc<Database>,
}

impl KvStore {
    /// Create new KvStore instance
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get the underlying database reference
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    // ========== Reads ==========

    /// Look up a single key
    ///
    /// The returned index covers both tables: a miss may mean the key never
    /// existed or that it was deleted.
    pub fn get(&self, key: &str) -> Result<(u64, Option<DirEntry>)> {
        let txn = self.db.begin_read();
        let tables = txn.tables();
        let idx = tables.max_index(&[TABLE_KVS, TABLE_TOMBSTONES]);
        Ok((idx, tables.kvs.get(key).cloned()))
    }

    /// All live entries under `prefix`, in key order
    pub fn list(&self, prefix: &str) -> Result<(u64, Vec<DirEntry>)> {
        let txn = self.db.begin_read();
        let tables = txn.tables();

        let mut entries = Vec::new();
        let mut lindex = 0;
        for (_, entry) in tables.kvs.scan_prefix(prefix) {
            lindex = lindex.max(entry.modify_index);
            entries.push(entry.clone());
        }

        Ok((prefix_index(tables, prefix, lindex), entries))
    }

    /// Keys under `prefix`, collapsed at the first `separator` after it
    ///
    /// Each key is cut just after the first occurrence of `separator`
    /// following `prefix`; consecutive identical results are emitted once.
    /// Keys without the separator pass through unchanged, and an empty
    /// separator returns every key. Collapsed keys still count toward the
    /// returned index.
    pub fn list_keys(&self, prefix: &str, separator: &str) -> Result<(u64, Vec<String>)> {
        let txn = self.db.begin_read();
        let tables = txn.tables();

        let mut keys: Vec<String> = Vec::new();
        let mut lindex = 0;
        let mut last: Option<&str> = None;
        for (key, entry) in tables.kvs.scan_prefix(prefix) {
            lindex = lindex.max(entry.modify_index);

            if separator.is_empty() {
                keys.push(key.clone());
                continue;
            }

            match key[prefix.len()..].find(separator) {
                Some(pos) => {
                    let collapsed = &key[..prefix.len() + pos + separator.len()];
                    if last != Some(collapsed) {
                        keys.push(collapsed.to_string());
                        last = Some(collapsed);
                    }
                }
                None => keys.push(key.clone()),
            }
        }

        Ok((prefix_index(tables, prefix, lindex), keys))
    }

    // ========== Writes ==========

    /// Create or update a key
    ///
    /// Keeps the existing `create_index`, lock holder and `lock_index`; a
    /// plain set never takes or releases a lock.
    pub fn set(&self, idx: u64, entry: DirEntry) -> Result<()> {
        let mut txn = self.db.begin_write();
        self.set_txn(&mut txn, idx, entry, false);
        txn.commit();
        Ok(())
    }

    /// Check-and-set
    ///
    /// `entry.modify_index == 0` writes only if the key is absent; any other
    /// value writes only if the live entry's `modify_index` matches it.
    /// Returns whether the write happened.
    pub fn set_cas(&self, idx: u64, entry: DirEntry) -> Result<bool> {
        let mut txn = self.db.begin_write();

        let matched = match (entry.modify_index, txn.tables().kvs.get(&entry.key)) {
            (0, existing) => existing.is_none(),
            (_, None) => false,
            (cidx, Some(existing)) => existing.modify_index == cidx,
        };
        if !matched {
            debug!(target: "coordkv::kvs", key = %entry.key, cidx = entry.modify_index, "CAS set skipped");
            return Ok(false);
        }

        self.set_txn(&mut txn, idx, entry, false);
        txn.commit();
        Ok(true)
    }

    /// Delete a single key; deleting a missing key is a no-op
    pub fn delete(&self, idx: u64, key: &str) -> Result<()> {
        let mut txn = self.db.begin_write();
        if self.delete_txn(&mut txn, idx, key) {
            txn.commit();
        }
        Ok(())
    }

    /// Delete a key only if its `modify_index` equals `cidx`
    ///
    /// Returns `true` when the delete happened or when there was nothing to
    /// delete, and `false` only when a live entry exists with a different
    /// index. Retrying a delete-CAS that already applied is therefore not
    /// reported as a failure.
    pub fn delete_cas(&self, idx: u64, cidx: u64, key: &str) -> Result<bool> {
        let mut txn = self.db.begin_write();

        match txn.tables().kvs.get(key) {
            None => return Ok(true),
            Some(existing) if existing.modify_index != cidx => {
                debug!(target: "coordkv::kvs", key, cidx, actual = existing.modify_index, "CAS delete skipped");
                return Ok(false);
            }
            Some(_) => {}
        }

        self.delete_txn(&mut txn, idx, key);
        txn.commit();
        Ok(true)
    }

    /// Delete every key under `prefix`
    ///
    /// All tombstones share `idx`, the watermark moves once and a single
    /// recursive notification covers the whole prefix.
    pub fn delete_tree(&self, idx: u64, prefix: &str) -> Result<()> {
        let mut txn = self.db.begin_write();

        // Collect first, delete second: never mutate the table being scanned
        let doomed: Vec<String> = txn
            .tables()
            .kvs
            .scan_prefix(prefix)
            .map(|(key, _)| key.clone())
            .collect();
        if doomed.is_empty() {
            return Ok(());
        }

        let tables = txn.tables_mut();
        for key in &doomed {
            graveyard::insert(tables, key, idx);
        }
        for key in &doomed {
            tables.kvs.remove(key);
        }
        tables.bump_index(TABLE_KVS, idx);

        self.defer_notify(&mut txn, prefix.to_string(), true);
        txn.commit();

        debug!(target: "coordkv::kvs", prefix, index = idx, deleted = doomed.len(), "Tree deleted");
        Ok(())
    }

    /// Delete tombstones with `index <= idx`, returning how many were reaped
    pub fn reap_tombstones(&self, idx: u64) -> Result<usize> {
        let mut txn = self.db.begin_write();
        let reaped = graveyard::reap(txn.tables_mut(), idx);
        txn.commit();
        info!(target: "coordkv::kvs", threshold = idx, reaped, "Reaped tombstones");
        Ok(reaped)
    }

    /// Lock-delay expiration for `key`, if still in the future
    pub fn lock_delay(&self, key: &str) -> Option<DateTime<Utc>> {
        self.db.lock_delay().expiration(key)
    }

    // ========== Transaction-level helpers ==========

    /// Upsert inside an open transaction
    ///
    /// With `update_session` the incoming session and `lock_index` are
    /// adopted as-is (lock manager only); otherwise the stored holder and
    /// lock count are kept, and a new key starts unlocked.
    pub(crate) fn set_txn(
        &self,
        txn: &mut WriteTxn<'_>,
        idx: u64,
        mut entry: DirEntry,
        update_session: bool,
    ) {
        match txn.tables().kvs.get(&entry.key) {
            Some(existing) => {
                entry.create_index = existing.create_index;
                if !update_session {
                    entry.session = existing.session.clone();
                    entry.lock_index = existing.lock_index;
                }
            }
            None => {
                entry.create_index = idx;
                if !update_session {
                    entry.session = None;
                    entry.lock_index = 0;
                }
            }
        }
        entry.modify_index = idx;

        let key = entry.key.clone();
        let tables = txn.tables_mut();
        graveyard::remove(tables, &key);
        tables.kvs.insert(key.clone(), entry);
        tables.bump_index(TABLE_KVS, idx);

        debug!(target: "coordkv::kvs", key = %key, index = idx, "Entry set");
        self.defer_notify(txn, key, false);
    }

    /// Delete inside an open transaction, returning whether anything changed
    pub(crate) fn delete_txn(&self, txn: &mut WriteTxn<'_>, idx: u64, key: &str) -> bool {
        if !txn.tables().kvs.contains(key) {
            return false;
        }

        let tables = txn.tables_mut();
        graveyard::insert(tables, key, idx);
        tables.kvs.remove(key);
        tables.bump_index(TABLE_KVS, idx);

        debug!(target: "coordkv::kvs", key, index = idx, "Entry deleted");
        self.defer_notify(txn, key.to_string(), false);
        true
    }

    fn defer_notify(&self, txn: &mut WriteTxn<'_>, prefix: String, recursive: bool) {
        let notifier = Arc::clone(self.db.notifier());
        txn.defer(move || notifier.notify(&prefix, recursive));
    }
}

/// Blocking-read index for a prefix read whose live matches peaked at `lindex`
fn prefix_index(tables: &Tables, prefix: &str, mut lindex: u64) -> u64 {
    let idx = tables.max_index(&[TABLE_KVS, TABLE_TOMBSTONES]);

    if prefix.is_empty() {
        // Listing everything: the table watermarks are authoritative
        lindex = idx;
    } else {
        lindex = lindex.max(graveyard::max_index(tables, prefix));
    }

    if lindex != 0 {
        lindex
    } else {
        idx
    }
}
