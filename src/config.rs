//! Store configuration
//!
//! Read from `~/.config/chunkcas/config.json` when present:
//!
//! ```json
//! { "root": "/var/cache/build/cas", "worker_threads": 6, "log_filter": "chunkcas=debug" }
//! ```
//!
//! Every field is optional.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Worker threads used when the config does not say
pub const DEFAULT_WORKER_THREADS: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Content root; defaults to a directory under the user cache dir
    pub root: Option<PathBuf>,
    /// Concurrent blocking I/O jobs per store
    pub worker_threads: usize,
    /// `tracing` filter used by the CLI when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            root: None,
            worker_threads: DEFAULT_WORKER_THREADS,
            log_filter: None,
        }
    }
}

impl StoreConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chunkcas").join("config.json"))
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let config: StoreConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the default config file, or defaults when there is none
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(Error::Config("worker_threads must be at least 1".into()));
        }
        Ok(())
    }

    /// Resolve the content root directory
    pub fn store_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        let cache = dirs::cache_dir()
            .ok_or_else(|| Error::Config("Could not find cache directory".into()))?;
        Ok(cache.join("chunkcas").join("objects"))
    }
}
