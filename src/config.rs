//! Configuration for watermelondb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Backing file holding every page of the store
    pub path: PathBuf,

    /// `sync_data` after every page write
    pub sync_on_write: bool,

    // -------------------------------------------------------------------------
    // Allocation Configuration
    // -------------------------------------------------------------------------
    /// What happens to a reuse candidate that turns out to be too full
    pub freelist_policy: FreeListPolicy,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Scan every page at open and rebuild the key index from the records found.
    ///
    /// Off by default: the index normally starts empty on every open.
    pub rebuild_index_on_open: bool,
}

/// Freelist reuse policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreeListPolicy {
    /// A popped page that cannot hold the incoming record is dropped for good
    #[default]
    Legacy,

    /// A popped page that cannot hold the incoming record is pushed back with
    /// its refreshed free-byte estimate
    Requeue,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./watermelondata"),
            sync_on_write: false,
            freelist_policy: FreeListPolicy::Legacy,
            rebuild_index_on_open: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the backing file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Sync page data to disk after every write
    pub fn sync_on_write(mut self, enabled: bool) -> Self {
        self.config.sync_on_write = enabled;
        self
    }

    /// Set the freelist reuse policy
    pub fn freelist_policy(mut self, policy: FreeListPolicy) -> Self {
        self.config.freelist_policy = policy;
        self
    }

    /// Rebuild the index from on-disk pages when the store is opened
    pub fn rebuild_index_on_open(mut self, enabled: bool) -> Self {
        self.config.rebuild_index_on_open = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
