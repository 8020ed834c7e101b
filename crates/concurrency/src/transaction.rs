//! Read and write transactions
//!
//! A `WriteTxn` owns the writer lock for its whole lifetime. It starts from
//! the current root, mutates a private clone, and on `commit`:
//!
//! ```text
//! 1. publish the working copy as the new root (single pointer swap)
//! 2. release the writer lock
//! 3. run deferred callbacks in registration order
//! ```
//!
//! Dropping a transaction without committing aborts it: the working copy is
//! discarded and deferred callbacks are dropped without running, so watchers
//! never hear about state that was rolled back.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::MutexGuard;
use tracing::debug;

use coordkv_storage::{Tables, VersionedStore};

use crate::manager::Counters;

type Deferred = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle of a write transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting reads and writes
    Active,
    /// Published
    Committed,
    /// Discarded
    Aborted,
}

/// Read-only view pinned to one root version
#[derive(Debug, Clone)]
pub struct ReadTxn {
    root: Arc<Tables>,
}

impl ReadTxn {
    pub(crate) fn new(root: Arc<Tables>) -> Self {
        Self { root }
    }

    /// The pinned root
    #[inline]
    pub fn tables(&self) -> &Tables {
        &self.root
    }
}

/// Exclusive write transaction
pub struct WriteTxn<'a> {
    guard: Option<MutexGuard<'a, ()>>,
    store: &'a VersionedStore,
    counters: &'a Counters,
    working: Tables,
    deferred: Vec<Deferred>,
    status: TransactionStatus,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(
        guard: MutexGuard<'a, ()>,
        store: &'a VersionedStore,
        counters: &'a Counters,
    ) -> Self {
        // Load under the writer lock so no commit can slip in between
        let working = (*store.load()).clone();
        Self {
            guard: Some(guard),
            store,
            counters,
            working,
            deferred: Vec::new(),
            status: TransactionStatus::Active,
        }
    }

    /// Current state including this transaction's own writes
    #[inline]
    pub fn tables(&self) -> &Tables {
        &self.working
    }

    /// Mutable access to the working copy
    #[inline]
    pub fn tables_mut(&mut self) -> &mut Tables {
        &mut self.working
    }

    /// Register a callback to run after a successful commit
    pub fn defer<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.deferred.push(Box::new(f));
    }

    /// Number of callbacks waiting for commit
    pub fn pending_callbacks(&self) -> usize {
        self.deferred.len()
    }

    /// Current lifecycle state
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Publish the working copy and run deferred callbacks
    ///
    /// Returns the publication counter of the new root.
    pub fn commit(mut self) -> u64 {
        let working = std::mem::take(&mut self.working);
        let deferred = std::mem::take(&mut self.deferred);

        let version = self.store.publish(Arc::new(working));
        self.status = TransactionStatus::Committed;
        self.counters.committed.fetch_add(1, Ordering::Relaxed);

        // Writers may proceed while callbacks run
        drop(self.guard.take());

        debug!(
            target: "coordkv::txn",
            version,
            callbacks = deferred.len(),
            "Transaction committed"
        );
        for callback in deferred {
            callback();
        }
        version
    }

    /// Discard the working copy and all deferred callbacks
    pub fn abort(mut self) {
        self.abort_in_place();
    }

    fn abort_in_place(&mut self) {
        if self.status != TransactionStatus::Active {
            return;
        }
        self.status = TransactionStatus::Aborted;
        self.counters.aborted.fetch_add(1, Ordering::Relaxed);
        let dropped = self.deferred.len();
        self.deferred.clear();
        self.guard.take();
        debug!(target: "coordkv::txn", dropped_callbacks = dropped, "Transaction aborted");
    }
}

impl Drop for WriteTxn<'_> {
    fn drop(&mut self) {
        self.abort_in_place();
    }
}

impl std::fmt::Debug for WriteTxn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTxn")
            .field("status", &self.status)
            .field("pending_callbacks", &self.deferred.len())
            .finish()
    }
}
