//! Versioned table substrate for coordkv
//!
//! This crate implements the immutable, multi-reader storage layer with:
//! - Table: ordered, structurally shared map (`im::OrdMap`) with prefix scans
//! - Tables: one root version holding every table plus the index watermarks
//! - VersionedStore: publishes root versions through `ArcSwap`
//!
//! # Snapshot Isolation
//!
//! A root version is never mutated once published. Readers load an
//! `Arc<Tables>` and keep a stable view for as long as they hold it; a writer
//! clones the root (O(1), structure is shared), mutates its private copy and
//! publishes it in a single pointer swap. Readers never take a lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod store;
pub mod table;
pub mod tables;

pub use store::VersionedStore;
pub use table::Table;
pub use tables::Tables;
