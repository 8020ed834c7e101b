//! Prefix watch: one-shot wake-ups for blocking reads
//!
//! A caller that wants to block until something under a prefix changes
//! registers a `WatchHandle` for that prefix, re-reads, and waits on the
//! handle. `notify(prefix, recursive)` fires:
//! - every handle registered on a prefix of `prefix` (the path from the
//!   root "" down to the changed key), and
//! - when `recursive`, every handle registered anywhere under `prefix`.
//!
//! Handles fire at most once and are unregistered when fired, so the number
//! of outstanding registrations never grows with the number of events.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

use coordkv_core::WatchNotifier;

/// One-shot wake-up for a single waiter
#[derive(Debug, Default)]
pub struct WatchHandle {
    fired: AtomicBool,
    notify: Notify,
}

impl WatchHandle {
    /// Whether the watched prefix has changed since registration
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Wait until the watched prefix changes
    ///
    /// Returns immediately if the handle already fired.
    pub async fn wait(&self) {
        if self.has_fired() {
            return;
        }
        self.notify.notified().await;
    }

    fn fire(&self) {
        self.fired.store(true, Ordering::Release);
        // Stores a permit if nobody is waiting yet
        self.notify.notify_one();
    }
}

/// Registry of prefix watches
#[derive(Debug, Default)]
pub struct PrefixWatch {
    watches: Mutex<BTreeMap<String, Vec<Arc<WatchHandle>>>>,
}

impl PrefixWatch {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a one-shot watch on `prefix`
    ///
    /// Handles whose waiters have all dropped them are pruned first, so a
    /// prefix that never changes does not accumulate abandoned watches.
    pub fn watch(&self, prefix: &str) -> Arc<WatchHandle> {
        let handle = Arc::new(WatchHandle::default());
        let mut watches = self.watches.lock();
        watches.retain(|_, handles| {
            handles.retain(|h| Arc::strong_count(h) > 1);
            !handles.is_empty()
        });
        watches
            .entry(prefix.to_string())
            .or_default()
            .push(Arc::clone(&handle));
        handle
    }

    /// Number of handles waiting to fire
    pub fn pending(&self) -> usize {
        self.watches.lock().values().map(Vec::len).sum()
    }

    fn take_matching(&self, prefix: &str, recursive: bool) -> Vec<Arc<WatchHandle>> {
        let mut watches = self.watches.lock();

        let mut keys: Vec<String> = watches
            .keys()
            .filter(|watched| prefix.starts_with(watched.as_str()))
            .cloned()
            .collect();
        if recursive {
            keys.extend(
                watches
                    .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
                    .take_while(|(watched, _)| watched.starts_with(prefix))
                    .map(|(watched, _)| watched.clone()),
            );
        }

        keys.into_iter()
            .filter_map(|k| watches.remove(&k))
            .flatten()
            .collect()
    }
}

impl WatchNotifier for PrefixWatch {
    fn notify(&self, prefix: &str, recursive: bool) {
        // Fire outside the registry lock
        let fired = self.take_matching(prefix, recursive);
        trace!(
            target: "coordkv::watch",
            prefix,
            recursive,
            fired = fired.len(),
            "Watch notify"
        );
        for handle in fired {
            handle.fire();
        }
    }
}
