//! Concurrency layer for coordkv
//!
//! This crate implements single-writer / multi-reader transactions with:
//! - ReadTxn: a pinned, immutable root version
//! - WriteTxn: a private working copy, published atomically on commit
//! - Deferred callbacks that run only after a successful commit
//! - TransactionManager: serializes writers and counts outcomes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod transaction;

pub use manager::{TransactionManager, TransactionMetrics};
pub use transaction::{ReadTxn, TransactionStatus, WriteTxn};
