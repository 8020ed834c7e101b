//! Record types stored by the state engine
//!
//! All indexes are consensus log indexes supplied by the replicated-apply
//! layer. They are strictly increasing across mutations and are the only
//! notion of time the engine uses for ordering, CAS and blocking reads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the key/value table (also its watermark name).
pub const TABLE_KVS: &str = "kvs";
/// Name of the tombstone graveyard table (also its watermark name).
pub const TABLE_TOMBSTONES: &str = "tombstones";
/// Name of the sessions table (also its watermark name).
pub const TABLE_SESSIONS: &str = "sessions";

/// A live key/value record.
///
/// `session` is `None` when the key is unlocked. `lock_index` counts how
/// many times the key moved from unlocked to locked and never decreases.
/// `create_index <= modify_index` holds for every stored entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Primary key
    pub key: String,
    /// Opaque payload
    pub value: Vec<u8>,
    /// Opaque client metadata
    pub flags: u64,
    /// Holder of the advisory lock, if any
    pub session: Option<String>,
    /// Number of successful acquisitions
    pub lock_index: u64,
    /// Log index at which the key came into existence
    pub create_index: u64,
    /// Log index of the latest mutation
    pub modify_index: u64,
}

impl DirEntry {
    /// Create an entry carrying only a key and a value.
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Set the session reference (builder style).
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Set the flags (builder style).
    pub fn with_flags(mut self, flags: u64) -> Self {
        self.flags = flags;
        self
    }

    /// Set the expected modify index for check-and-set (builder style).
    pub fn with_modify_index(mut self, modify_index: u64) -> Self {
        self.modify_index = modify_index;
        self
    }

    /// Whether some session currently holds this key.
    pub fn is_locked(&self) -> bool {
        self.session.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Whether `session` is the current holder.
    pub fn is_held_by(&self, session: &str) -> bool {
        self.session.as_deref() == Some(session)
    }
}

/// A deleted key and the log index of its deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    /// Deleted key
    pub key: String,
    /// Log index of the delete
    pub index: u64,
}

/// A lease identity that locks refer to.
///
/// The engine only checks that a session exists when a lock is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier
    pub id: String,
    /// Node that owns the session
    pub node: String,
    /// Log index at which the session was registered
    pub create_index: u64,
}

impl Session {
    /// Create a session with a random identifier.
    pub fn new(node: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), node)
    }

    /// Create a session with a caller-chosen identifier.
    pub fn with_id(id: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node: node.into(),
            create_index: 0,
        }
    }
}
