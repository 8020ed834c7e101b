//! Engine configuration via `coordkv.toml`
//!
//! On first open, a default `coordkv.toml` is created in the data directory.
//! To change settings, edit the file and restart.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use coordkv_core::{Error, Result};

/// Config file name placed in the data directory.
pub const CONFIG_FILE_NAME: &str = "coordkv.toml";

/// Engine configuration loaded from `coordkv.toml`.
///
/// # Example
///
/// ```toml
/// # Grace period before a lost lock can be taken again
/// lock_delay_ms = 15000
///
/// # Deliver post-commit change events to the built-in prefix watch
/// watch_enabled = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Default lock-delay in milliseconds.
    #[serde(default = "default_lock_delay_ms")]
    pub lock_delay_ms: u64,
    /// Deliver change events to the built-in prefix watch.
    #[serde(default = "default_watch_enabled")]
    pub watch_enabled: bool,
}

fn default_lock_delay_ms() -> u64 {
    15_000
}

fn default_watch_enabled() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_delay_ms: default_lock_delay_ms(),
            watch_enabled: default_watch_enabled(),
        }
    }
}

impl EngineConfig {
    /// Default lock-delay as a `Duration`.
    pub fn lock_delay(&self) -> Duration {
        Duration::from_millis(self.lock_delay_ms)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# coordkv state engine configuration
#
# Grace period (milliseconds) before a key whose lock was lost can be
# locked again when the caller gives none (default: 15000).
lock_delay_ms = 15000

# Deliver post-commit change events to the built-in prefix watch
# (default: true). Set to false when an external watch subsystem is used.
watch_enabled = true
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
