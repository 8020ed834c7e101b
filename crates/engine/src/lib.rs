//! State engine for coordkv
//!
//! This crate orchestrates the lower layers into the replicated-apply state
//! store:
//! - Database: transaction manager, lock-delay tracker, watch notifier, config
//! - KvStore: set/get/list/delete, check-and-set, tree delete, locks, reaping
//! - Graveyard: tombstones that keep deletes visible to prefix reads
//! - SessionStore: the sessions table locks are validated against
//! - StateSnapshot / StateRestore: bulk export and import
//!
//! Every mutation takes the log index of the replicated operation that
//! produced it. Applying the same sequence of operations to two databases
//! yields identical state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod graveyard;
pub mod kvs;
pub mod lock_delay;
mod locks;
pub mod sessions;
pub mod snapshot;
pub mod watch;

pub use database::{Database, EngineConfig, CONFIG_FILE_NAME};
pub use kvs::KvStore;
pub use lock_delay::LockDelay;
pub use sessions::SessionStore;
pub use snapshot::{RestoreStats, StateRestore, StateSnapshot};
pub use watch::{PrefixWatch, WatchHandle};

pub use coordkv_core::{
    DirEntry, Error, LockDelayLookup, NoopNotifier, Result, Session, Tombstone, WatchNotifier,
};
