//! Transaction manager for coordinating writers
//!
//! Writers are serialized by one mutex held for the lifetime of a
//! `WriteTxn`. That is enough for this engine: every mutating operation
//! finishes in a single bounded in-memory pass and never waits on I/O.
//! Readers never touch the mutex.
//!
//! # Memory Ordering
//!
//! The outcome counters use Relaxed ordering. They are observational only
//! and do not synchronize any other memory.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use coordkv_storage::{Tables, VersionedStore};

use crate::transaction::{ReadTxn, WriteTxn};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) committed: AtomicU64,
    pub(crate) aborted: AtomicU64,
}

/// Snapshot of transaction outcome counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionMetrics {
    /// Write transactions committed
    pub committed: u64,
    /// Write transactions aborted (explicitly or by drop)
    pub aborted: u64,
}

/// Owns the versioned store and hands out transactions
#[derive(Debug)]
pub struct TransactionManager {
    store: VersionedStore,
    writer: Mutex<()>,
    counters: Counters,
}

impl TransactionManager {
    /// Create a manager over an empty store
    pub fn new() -> Self {
        Self::from_tables(Tables::new())
    }

    /// Create a manager over an existing root version
    pub fn from_tables(tables: Tables) -> Self {
        Self {
            store: VersionedStore::from_tables(tables),
            writer: Mutex::new(()),
            counters: Counters::default(),
        }
    }

    /// Start a read-only transaction on the current root
    ///
    /// Never blocks, even while a writer is active.
    pub fn begin_read(&self) -> ReadTxn {
        ReadTxn::new(self.store.load())
    }

    /// Start the (single) write transaction
    ///
    /// Blocks until any other write transaction finishes.
    pub fn begin_write(&self) -> WriteTxn<'_> {
        let guard = self.writer.lock();
        WriteTxn::new(guard, &self.store, &self.counters)
    }

    /// Number of root versions published so far
    pub fn current_version(&self) -> u64 {
        self.store.version()
    }

    /// Outcome counters
    pub fn metrics(&self) -> TransactionMetrics {
        TransactionMetrics {
            committed: self.counters.committed.load(Ordering::Relaxed),
            aborted: self.counters.aborted.load(Ordering::Relaxed),
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
