//! Error types for coordkv
//!
//! Only structural faults and malformed requests are errors. Expected
//! outcomes of replicated operations (CAS mismatch, lock contention, unlock
//! by a non-holder, delete of an absent key) are reported as booleans by the
//! operations themselves so that apply stays deterministic.

use std::io;
use thiserror::Error;

/// Result type alias for coordkv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the coordkv state engine
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while streaming a snapshot or reading config
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A lock or unlock request carried no session
    #[error("missing session")]
    MissingSession,

    /// A lock request referenced a session that does not exist
    #[error("invalid session {0:?}")]
    InvalidSession(String),

    /// The substrate could not perform an operation consistently
    #[error("{operation} failed for key {key:?}: {reason}")]
    Storage {
        /// Name of the failing operation
        operation: &'static str,
        /// Key the operation was applied to
        key: String,
        /// What went wrong
        reason: String,
    },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a structural storage fault for `operation` on `key`.
    pub fn storage(operation: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Storage {
            operation,
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// True for request-shape errors (as opposed to substrate faults).
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::MissingSession | Error::InvalidSession(_))
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
