//! Database: the state engine's shared context
//!
//! A `Database` owns:
//! - the transaction manager (single writer, lock-free readers)
//! - the lock-delay tracker
//! - the watch notifier that receives post-commit change events
//! - the engine configuration
//!
//! Facades (`KvStore`, `SessionStore`) are stateless and hold an
//! `Arc<Database>`; any number of them may share one database.

pub mod config;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use coordkv_concurrency::{ReadTxn, TransactionManager, TransactionMetrics, WriteTxn};
use coordkv_core::{NoopNotifier, Result, WatchNotifier};

use crate::lock_delay::LockDelay;
use crate::snapshot::{self, RestoreStats, StateRestore, StateSnapshot};
use crate::watch::{PrefixWatch, WatchHandle};

pub use config::{EngineConfig, CONFIG_FILE_NAME};

/// Shared state behind every facade
pub struct Database {
    manager: TransactionManager,
    lock_delay: LockDelay,
    prefix_watch: Arc<PrefixWatch>,
    notifier: Arc<dyn WatchNotifier>,
    config: EngineConfig,
}

impl Database {
    /// Create an empty database with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an empty database with the given configuration
    ///
    /// Change events go to the built-in prefix watch unless
    /// `watch_enabled` is false, in which case they are dropped.
    pub fn with_config(config: EngineConfig) -> Self {
        let prefix_watch = Arc::new(PrefixWatch::new());
        let notifier: Arc<dyn WatchNotifier> = if config.watch_enabled {
            prefix_watch.clone() as Arc<dyn WatchNotifier>
        } else {
            Arc::new(NoopNotifier)
        };
        Self::assemble(config, prefix_watch, notifier)
    }

    /// Create an empty database that sends change events to `notifier`
    ///
    /// Used when an external watch subsystem owns fan-out.
    pub fn with_notifier(config: EngineConfig, notifier: Arc<dyn WatchNotifier>) -> Self {
        Self::assemble(config, Arc::new(PrefixWatch::new()), notifier)
    }

    /// Create an empty database configured from `coordkv.toml` in `dir`
    ///
    /// Writes the default config file first if none exists.
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        EngineConfig::write_default_if_missing(&path)?;
        let config = EngineConfig::from_file(&path)?;
        info!(target: "coordkv::db", path = ?path, "Loaded engine configuration");
        Ok(Self::with_config(config))
    }

    fn assemble(
        config: EngineConfig,
        prefix_watch: Arc<PrefixWatch>,
        notifier: Arc<dyn WatchNotifier>,
    ) -> Self {
        Self {
            manager: TransactionManager::new(),
            lock_delay: LockDelay::new(config.lock_delay()),
            prefix_watch,
            notifier,
            config,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lock-delay tracker
    pub fn lock_delay(&self) -> &LockDelay {
        &self.lock_delay
    }

    /// Register a one-shot watch on `prefix` with the built-in prefix watch
    pub fn watch(&self, prefix: &str) -> Arc<WatchHandle> {
        self.prefix_watch.watch(prefix)
    }

    /// Built-in prefix watch
    pub fn prefix_watch(&self) -> &Arc<PrefixWatch> {
        &self.prefix_watch
    }

    /// Receiver of post-commit change events
    pub fn notifier(&self) -> &Arc<dyn WatchNotifier> {
        &self.notifier
    }

    /// Start a read-only transaction
    pub fn begin_read(&self) -> ReadTxn {
        self.manager.begin_read()
    }

    /// Start the write transaction (blocks while another writer is active)
    pub fn begin_write(&self) -> WriteTxn<'_> {
        self.manager.begin_write()
    }

    /// Transaction outcome counters
    pub fn metrics(&self) -> TransactionMetrics {
        self.manager.metrics()
    }

    /// Consistent point-in-time view for export
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::new(self.begin_read())
    }

    /// Record-by-record importer for bootstrap from a snapshot
    pub fn restore(&self) -> StateRestore<'_> {
        StateRestore::new(self)
    }

    /// Import a stream written by [`StateSnapshot::persist`]
    pub fn restore_from<R: Read>(&self, reader: &mut R) -> Result<RestoreStats> {
        snapshot::read_into(reader, self.restore())
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("metrics", &self.metrics())
            .finish()
    }
}
