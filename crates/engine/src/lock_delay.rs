//! Lock-delay tracker
//!
//! After a lock is lost without a clean release (for example because its
//! session expired), the key gets a short grace period during which nobody
//! should acquire it. This keeps a former holder that has not yet noticed
//! the loss from racing with a new one.
//!
//! The engine does not enforce the delay. Callers read it through
//! `KvStore::lock_delay` before issuing a lock and treat a future
//! expiration as contention. Expired entries are purged lazily on lookup.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::debug;

use coordkv_core::LockDelayLookup;

/// Per-key lock-delay expirations
#[derive(Debug)]
pub struct LockDelay {
    delays: DashMap<String, DateTime<Utc>>,
    default_delay: Duration,
}

impl LockDelay {
    /// Create a tracker using `default_delay` when callers give none
    pub fn new(default_delay: Duration) -> Self {
        Self {
            delays: DashMap::new(),
            default_delay,
        }
    }

    /// Delay applied when `set_expiration` gets `None`
    pub fn default_delay(&self) -> Duration {
        self.default_delay
    }

    /// Block `key` from being locked until `now + delay`
    ///
    /// A zero delay clears any pending expiration for the key.
    pub fn set_expiration(&self, key: &str, now: DateTime<Utc>, delay: Option<Duration>) {
        let delay = delay.unwrap_or(self.default_delay);
        if delay.is_zero() {
            self.delays.remove(key);
            return;
        }
        let millis = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        let until = TimeDelta::try_milliseconds(millis)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        debug!(target: "coordkv::lock_delay", key, until = %until, "Lock delay set");
        self.delays.insert(key.to_string(), until);
    }

    /// Expiration for `key` as seen at `now`
    pub fn expiration_at(&self, key: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let until = *self.delays.get(key)?;
        if until > now {
            return Some(until);
        }
        // Only drop it if nobody re-armed it meanwhile
        self.delays.remove_if(key, |_, v| *v <= now);
        None
    }

    /// Number of keys with a tracked (possibly stale) expiration
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    /// Whether no key is tracked
    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}

impl LockDelayLookup for LockDelay {
    fn expiration(&self, key: &str) -> Option<DateTime<Utc>> {
        self.expiration_at(key, Utc::now())
    }
}
