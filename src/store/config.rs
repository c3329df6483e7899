//! Store configuration
//!
//! Options can be set in code through [`StoreBuilder`] or loaded from TOML:
//!
//! ```toml
//! sync_on_commit = false
//! read_only = false
//! create_if_missing = true
//! ```

use crate::error::{NestboxError, Result};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options applied when opening a [`Store`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Fsync the data file and its directory on every commit
    pub sync_on_commit: bool,

    /// Reject write transactions
    pub read_only: bool,

    /// Create an empty store when the file does not exist
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            sync_on_commit: true,
            read_only: false,
            create_if_missing: true,
        }
    }
}

impl StoreConfig {
    /// Parse a configuration from a TOML document
    ///
    /// Missing keys take their default values.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| NestboxError::InvalidConfig(e.to_string()))
    }

    /// Load a configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// Builder for opening a [`Store`]
///
/// # Examples
///
/// ```rust,no_run
/// use nestbox::StoreBuilder;
///
/// # fn main() -> nestbox::Result<()> {
/// let store = StoreBuilder::new()
///     .path("/var/lib/app/data.nbox")
///     .sync_on_commit(false)
///     .open()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    path: Option<PathBuf>,
    config: StoreConfig,
}

impl StoreBuilder {
    /// Builder with default options and no path
    pub fn new() -> Self {
        Self::default()
    }

    /// Backing file (omit for an in-memory store)
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Replace all options at once
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Fsync on every commit (default `true`)
    pub fn sync_on_commit(mut self, sync: bool) -> Self {
        self.config.sync_on_commit = sync;
        self
    }

    /// Reject write transactions (default `false`)
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.config.read_only = read_only;
        self
    }

    /// Create the file when it does not exist (default `true`)
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.config.create_if_missing = create;
        self
    }

    /// Open the store
    pub fn open(self) -> Result<Store> {
        match self.path {
            Some(path) => Store::open_with_config(path, self.config),
            None => Ok(Store::in_memory_with_config(self.config)),
        }
    }
}
