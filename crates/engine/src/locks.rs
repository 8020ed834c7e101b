//! Session-bound advisory locks
//!
//! An entry's `session` field names its lock holder. Per key:
//!
//! ```text
//! Unlocked         --lock(S)-->    Locked(S)   lock_index += 1
//! Locked(S)        --lock(S)-->    Locked(S)   lock_index unchanged
//! Locked(S)        --unlock(S)-->  Unlocked
//! Locked(S)        --lock(T)-->    Locked(S)   returns false
//! Locked(S)        --unlock(T)-->  Locked(S)   returns false
//! ```
//!
//! The session is validated against the sessions table only when a lock is
//! taken; destroying a session later does not release its locks.

use tracing::{debug, warn};

use coordkv_core::{DirEntry, Error, Result};

use crate::kvs::KvStore;

fn holder(entry: &DirEntry) -> Result<&str> {
    match entry.session.as_deref() {
        Some(session) if !session.is_empty() => Ok(session),
        _ => Err(Error::MissingSession),
    }
}

impl KvStore {
    /// Acquire the lock on `entry.key` for `entry.session`, writing `entry`
    ///
    /// Returns `Ok(false)` when another session holds the lock.
    ///
    /// # Errors
    ///
    /// - `MissingSession` if `entry.session` is unset or empty
    /// - `InvalidSession` if the session is not registered
    pub fn lock(&self, idx: u64, mut entry: DirEntry) -> Result<bool> {
        let session = holder(&entry)?.to_string();

        let mut txn = self.database().begin_write();

        if !txn.tables().sessions.contains(&session) {
            warn!(target: "coordkv::locks", key = %entry.key, session = %session, "Lock with unknown session");
            return Err(Error::InvalidSession(session));
        }

        match txn.tables().kvs.get(&entry.key) {
            None => entry.lock_index = 1,
            Some(existing) if existing.is_held_by(&session) => {
                entry.lock_index = existing.lock_index;
            }
            Some(existing) if existing.is_locked() => {
                debug!(target: "coordkv::locks", key = %entry.key, holder = ?existing.session, "Lock contended");
                return Ok(false);
            }
            Some(existing) => entry.lock_index = existing.lock_index + 1,
        }

        debug!(target: "coordkv::locks", key = %entry.key, session = %session, lock_index = entry.lock_index, "Lock acquired");
        self.set_txn(&mut txn, idx, entry, true);
        txn.commit();
        Ok(true)
    }

    /// Release the lock on `entry.key` held by `entry.session`, writing `entry`
    ///
    /// Returns `Ok(false)` when the key is missing or held by someone else.
    ///
    /// # Errors
    ///
    /// `MissingSession` if `entry.session` is unset or empty.
    pub fn unlock(&self, idx: u64, mut entry: DirEntry) -> Result<bool> {
        let session = holder(&entry)?.to_string();

        let mut txn = self.database().begin_write();

        match txn.tables().kvs.get(&entry.key) {
            Some(existing) if existing.is_held_by(&session) => {
                entry.lock_index = existing.lock_index;
            }
            _ => return Ok(false),
        }
        entry.session = None;

        debug!(target: "coordkv::locks", key = %entry.key, session = %session, "Lock released");
        self.set_txn(&mut txn, idx, entry, true);
        txn.commit();
        Ok(true)
    }
}
