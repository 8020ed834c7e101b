//! Snapshot export and restore
//!
//! ## Export
//!
//! A `StateSnapshot` pins one read transaction, so the entry, tombstone and
//! session enumerations are mutually consistent as of a single instant and
//! stay stable while writers continue.
//!
//! ## Stream Format
//!
//! `persist` writes consecutive MessagePack values:
//!
//! ```text
//! Header { format, last_index, indexes }
//! Session*     (ordered by id)
//! Entry*       (ordered by key)
//! Tombstone*   (ordered by key)
//! End
//! ```
//!
//! ## Restore
//!
//! `StateRestore` inserts records as-is, bypassing normal index derivation:
//! entries keep their stored indexes and tombstones keep their deletion
//! index. Each record is applied in its own transaction, so a stream that
//! fails to decode halfway leaves the records before the failure in place.
//! Restore runs once, before the database serves other operations; `finish`
//! sends a single recursive notification on the root prefix.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use coordkv_concurrency::ReadTxn;
use coordkv_core::{DirEntry, Error, Result, Session, Tombstone, TABLE_KVS, TABLE_SESSIONS};

use crate::database::Database;
use crate::graveyard;

/// Stream format version written by `persist`
pub const SNAPSHOT_FORMAT: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    format: u8,
    last_index: u64,
    indexes: Vec<(String, u64)>,
}

#[derive(Serialize)]
enum RecordRef<'a> {
    Session(&'a Session),
    Entry(&'a DirEntry),
    Tombstone(&'a Tombstone),
    End,
}

#[derive(Deserialize)]
enum Record {
    Session(Session),
    Entry(DirEntry),
    Tombstone(Tombstone),
    End,
}

/// Consistent point-in-time view of the whole state
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    txn: ReadTxn,
}

impl StateSnapshot {
    /// Wrap a read transaction
    pub fn new(txn: ReadTxn) -> Self {
        Self { txn }
    }

    /// Highest watermark across all tables (0 for an empty store)
    pub fn last_index(&self) -> u64 {
        self.indexes().map(|(_, idx)| idx).max().unwrap_or(0)
    }

    /// Per-table watermarks
    pub fn indexes(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.txn.tables().indexes()
    }

    /// Live entries in key order
    pub fn kvs(&self) -> impl Iterator<Item = &DirEntry> + '_ {
        self.txn.tables().kvs.iter().map(|(_, entry)| entry)
    }

    /// Tombstones in key order
    pub fn tombstones(&self) -> impl Iterator<Item = &Tombstone> + '_ {
        graveyard::dump(self.txn.tables())
    }

    /// Sessions in id order
    pub fn sessions(&self) -> impl Iterator<Item = &Session> + '_ {
        self.txn.tables().sessions.iter().map(|(_, session)| session)
    }

    /// Write the snapshot as a MessagePack stream
    pub fn persist<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut ser = rmp_serde::Serializer::new(writer);

        let header = Header {
            format: SNAPSHOT_FORMAT,
            last_index: self.last_index(),
            indexes: self
                .indexes()
                .map(|(table, idx)| (table.to_string(), idx))
                .collect(),
        };
        header.serialize(&mut ser)?;

        for session in self.sessions() {
            RecordRef::Session(session).serialize(&mut ser)?;
        }
        for entry in self.kvs() {
            RecordRef::Entry(entry).serialize(&mut ser)?;
        }
        for stone in self.tombstones() {
            RecordRef::Tombstone(stone).serialize(&mut ser)?;
        }
        RecordRef::End.serialize(&mut ser)?;
        Ok(())
    }
}

/// Counts of records applied by a restore
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreStats {
    /// Live entries inserted
    pub entries: usize,
    /// Tombstones inserted
    pub tombstones: usize,
    /// Sessions inserted
    pub sessions: usize,
    /// Entries or tombstones dropped for a newer record on the same key
    pub superseded: usize,
}

/// Record-by-record importer
///
/// Each record commits on its own. A live entry and a tombstone for the
/// same key never coexist: the record with the higher index wins, and a
/// live entry wins a tie.
pub struct StateRestore<'a> {
    db: &'a Database,
    stats: RestoreStats,
}

impl<'a> StateRestore<'a> {
    /// Begin a restore
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            stats: RestoreStats::default(),
        }
    }

    /// Insert a live entry with its stored indexes
    ///
    /// Returns `false` if a newer tombstone for the key was kept instead.
    pub fn kvs(&mut self, entry: DirEntry) -> bool {
        let mut txn = self.db.begin_write();
        let tables = txn.tables_mut();
        tables.bump_index(TABLE_KVS, entry.modify_index);

        let deleted_at = tables.tombstones.get(&entry.key).map(|stone| stone.index);
        let applied = match deleted_at {
            Some(index) if index > entry.modify_index => false,
            Some(_) => {
                graveyard::remove(tables, &entry.key);
                true
            }
            None => true,
        };
        if applied {
            tables.kvs.insert(entry.key.clone(), entry);
        } else {
            debug!(target: "coordkv::snapshot", key = %entry.key, "Restored entry superseded by tombstone");
        }
        txn.commit();

        self.count(applied, |stats| stats.entries += 1);
        applied
    }

    /// Insert a tombstone with its deletion index
    ///
    /// Returns `false` if a live entry at least as new was kept instead.
    pub fn tombstone(&mut self, stone: Tombstone) -> bool {
        let mut txn = self.db.begin_write();
        let applied = graveyard::restore(txn.tables_mut(), stone);
        txn.commit();

        self.count(applied, |stats| stats.tombstones += 1);
        applied
    }

    /// Insert a session
    pub fn session(&mut self, session: Session) {
        let mut txn = self.db.begin_write();
        let tables = txn.tables_mut();
        tables.bump_index(TABLE_SESSIONS, session.create_index);
        tables.sessions.insert(session.id.clone(), session);
        txn.commit();
        self.stats.sessions += 1;
    }

    /// Raise a table watermark to at least `idx`
    pub fn index(&mut self, table: &str, idx: u64) {
        let mut txn = self.db.begin_write();
        txn.tables_mut().bump_index(table, idx);
        txn.commit();
    }

    /// Wake all watchers once and report what was applied
    pub fn finish(self) -> RestoreStats {
        self.db.notifier().notify("", true);
        info!(
            target: "coordkv::snapshot",
            entries = self.stats.entries,
            tombstones = self.stats.tombstones,
            sessions = self.stats.sessions,
            superseded = self.stats.superseded,
            "Restore finished"
        );
        self.stats
    }

    fn count(&mut self, applied: bool, inserted: impl FnOnce(&mut RestoreStats)) {
        if applied {
            inserted(&mut self.stats);
        } else {
            self.stats.superseded += 1;
        }
    }
}

/// Apply a stream written by [`StateSnapshot::persist`]
pub(crate) fn read_into<R: Read>(reader: &mut R, mut restore: StateRestore<'_>) -> Result<RestoreStats> {
    let mut de = rmp_serde::Deserializer::new(reader);

    let header = Header::deserialize(&mut de)?;
    if header.format != SNAPSHOT_FORMAT {
        return Err(Error::Serialization(format!(
            "unsupported snapshot format {}",
            header.format
        )));
    }
    for (table, idx) in &header.indexes {
        restore.index(table, *idx);
    }

    loop {
        match Record::deserialize(&mut de)? {
            Record::Session(session) => restore.session(session),
            Record::Entry(entry) => {
                restore.kvs(entry);
            }
            Record::Tombstone(stone) => {
                restore.tombstone(stone);
            }
            Record::End => break,
        }
    }

    Ok(restore.finish())
}
