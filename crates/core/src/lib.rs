//! Core types and traits for coordkv
//!
//! This crate defines the foundational types used throughout the system:
//! - DirEntry: a live key/value record with its log indexes and lock state
//! - Tombstone: a marker for a deleted key and the log index of the delete
//! - Session: the lease record a lock holder refers to
//! - Error: Error type hierarchy
//! - Traits: collaborator seams (watch notification, lock-delay lookup)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{LockDelayLookup, NoopNotifier, WatchNotifier};
pub use types::{DirEntry, Session, Tombstone, TABLE_KVS, TABLE_SESSIONS, TABLE_TOMBSTONES};
