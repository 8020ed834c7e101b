//! Collaborator seams consumed by the state engine
//!
//! The engine produces watch events and consumes lock-delay expirations;
//! both collaborators live outside the transactional core.

use chrono::{DateTime, Utc};

/// Receiver of post-commit change events.
///
/// Called only after a transaction commits, never on abort. `prefix` is a
/// single key for point mutations; `recursive` is set when everything under
/// `prefix` may have changed (tree deletes, restores).
pub trait WatchNotifier: Send + Sync {
    /// Deliver one change event.
    fn notify(&self, prefix: &str, recursive: bool);
}

/// Notifier that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl WatchNotifier for NoopNotifier {
    fn notify(&self, _prefix: &str, _recursive: bool) {}
}

/// Lookup of per-key lock-delay expirations.
pub trait LockDelayLookup: Send + Sync {
    /// Time before which `key` should not be locked again, if still in the future.
    fn expiration(&self, key: &str) -> Option<DateTime<Utc>>;
}
