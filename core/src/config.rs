//! Configuration types for Canopy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::traits::StoreResult;
use crate::types::{StoreType, Version};

/// Main node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name for logging
    pub name: String,

    /// Data directory
    pub data_dir: PathBuf,

    /// Database backend
    #[serde(default)]
    pub backend: DatabaseBackend,

    /// Logging level
    pub log_level: String,

    /// Version retention
    #[serde(default)]
    pub pruning: PruningOptions,

    /// Substores to mount, in mount order
    pub stores: Vec<MountConfig>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "canopy-node".to_string(),
            data_dir: PathBuf::from("./data"),
            backend: DatabaseBackend::default(),
            log_level: "info".to_string(),
            pruning: PruningOptions::default(),
            stores: vec![
                MountConfig::tree("main"),
                MountConfig::tree("accounts"),
                MountConfig::transient("transient"),
            ],
        }
    }
}

impl NodeConfig {
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let config: NodeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reject configs the multistore would refuse at mount time
    pub fn validate(&self) -> StoreResult<()> {
        for (i, store) in self.stores.iter().enumerate() {
            if store.name.is_empty() || store.name.contains('/') {
                return Err(StoreError::ConfigError(format!(
                    "invalid store name {:?}",
                    store.name
                )));
            }
            if self.stores[..i].iter().any(|s| s.name == store.name) {
                return Err(StoreError::ConfigError(format!(
                    "duplicate store name {:?}",
                    store.name
                )));
            }
        }
        self.pruning.validate()
    }
}

/// Database backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// sled database under `data_dir`
    #[default]
    Sled,
    /// Process-local, lost on exit
    Memory,
}

/// One substore mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    pub name: String,

    #[serde(default)]
    pub store_type: StoreType,

    /// Persist into an independent database instead of the shared one
    #[serde(default)]
    pub separate_db: bool,
}

impl MountConfig {
    pub fn tree(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store_type: StoreType::Tree,
            separate_db: false,
        }
    }

    pub fn transient(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store_type: StoreType::Transient,
            separate_db: false,
        }
    }
}

/// Which committed versions a tree store keeps on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PruningOptions {
    /// Number of most recent versions kept; `0` keeps everything
    pub keep_recent: Version,

    /// Versions divisible by this are kept regardless; `0` disables
    pub keep_every: Version,
}

impl PruningOptions {
    pub fn nothing() -> Self {
        Self::default()
    }

    pub fn new(keep_recent: Version, keep_every: Version) -> Self {
        Self {
            keep_recent,
            keep_every,
        }
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.keep_recent < 0 || self.keep_every < 0 {
            return Err(StoreError::ConfigError(format!(
                "pruning values must be non-negative: {:?}",
                self
            )));
        }
        Ok(())
    }

    /// Whether `version` falls outside retention once `committed` is the
    /// latest version. Applies to every older version, not only the one that
    /// just left the recent window, so a narrowed window catches up.
    pub fn should_prune(&self, version: Version, committed: Version) -> bool {
        if self.keep_recent == 0 || version < 1 {
            return false;
        }
        if version > committed - self.keep_recent {
            return false;
        }
        !(self.keep_every > 0 && version % self.keep_every == 0)
    }
}
