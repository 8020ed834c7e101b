//! coordkv - versioned key/value state engine for cluster coordination
//!
//! coordkv is the state machine a consensus layer applies committed log
//! entries to. Every node applying the same entries in the same order ends
//! up with identical state, so each mutation takes the log index of the
//! entry that carries it.
//!
//! # Quick Start
//!
//! ```ignore
//! use coordkv::{Database, DirEntry, KvStore};
//! use std::sync::Arc;
//!
//! let kv = KvStore::new(Arc::new(Database::new()));
//!
//! // Apply log entry 5
//! kv.set(5, DirEntry::new("service/web", b"10.0.0.1".to_vec()))?;
//!
//! // Read it back along with the index to block on
//! let (index, entry) = kv.get("service/web")?;
//! ```
//!
//! # Architecture
//!
//! - `coordkv-core`: entry types, errors, collaborator traits
//! - `coordkv-storage`: persistent tables published through an atomic root
//! - `coordkv-concurrency`: single-writer transactions with post-commit hooks
//! - `coordkv-engine`: the key/value, lock, session and snapshot operations
//!
//! Only the engine API is re-exported here.

pub use coordkv_engine::*;
