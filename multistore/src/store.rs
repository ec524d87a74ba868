//! The multistore: mount registry plus the live substore map

use canopy_core::{
    CommitId, CommitKvStore, PruningOptions, SharedDatabase, StoreError, StoreInfo, StoreKey,
    StoreResult, StoreType,
};
use std::collections::BTreeMap;
use tracing::info;

use crate::registry::{MountParams, StoreRegistry};

/// Live substores, one per mounted key, iterated in name order
pub(crate) type StoreMap = BTreeMap<StoreKey, Box<dyn CommitKvStore>>;

/// Multi-substore commit store.
///
/// Loading is one-shot: the substore map is either absent (before a
/// successful load) or holds exactly one substore per mounted key.
/// Commits need `&mut self`, so they cannot overlap with each other or
/// with queries on the same instance.
///
/// A commit that fails partway leaves some substores a version ahead of
/// the others. The instance then refuses further commits and answers
/// queries with an error; recovery means loading a fresh instance.
pub struct MultiStore {
    pub(crate) db: SharedDatabase,
    pub(crate) registry: StoreRegistry,
    pub(crate) pruning: PruningOptions,
    pub(crate) stores: Option<StoreMap>,
    pub(crate) last_commit_id: CommitId,
    /// Cause of a failed commit; set once, never cleared
    pub(crate) failure: Option<String>,
}

impl MultiStore {
    /// Create an unloaded multistore over the shared database `db`
    pub fn new(db: SharedDatabase) -> Self {
        Self {
            db,
            registry: StoreRegistry::new(),
            pruning: PruningOptions::default(),
            stores: None,
            last_commit_id: CommitId::default(),
            failure: None,
        }
    }

    /// Mount `key` into the shared database
    pub fn mount_store(&mut self, key: StoreKey, store_type: StoreType) -> StoreResult<()> {
        self.mount_store_with_db(key, store_type, None)
    }

    /// Mount `key`, optionally into its own database.
    ///
    /// Fails after load, for a key already mounted, and for a new key
    /// reusing a mounted name.
    pub fn mount_store_with_db(
        &mut self,
        key: StoreKey,
        store_type: StoreType,
        db: Option<SharedDatabase>,
    ) -> StoreResult<()> {
        if self.is_loaded() {
            return Err(StoreError::MountAfterLoad(key.name().to_string()));
        }
        let separate = db.is_some();
        self.registry
            .mount(key.clone(), MountParams::new(store_type, db))?;
        info!(
            "Mounted {} store {}{}",
            store_type,
            key.name(),
            if separate { " (separate db)" } else { "" }
        );
        Ok(())
    }

    /// Version retention for tree substores; only before load
    pub fn set_pruning(&mut self, pruning: PruningOptions) -> StoreResult<()> {
        if self.is_loaded() {
            return Err(StoreError::ConfigError(
                "pruning must be set before loading".to_string(),
            ));
        }
        pruning.validate()?;
        self.pruning = pruning;
        Ok(())
    }

    pub fn pruning(&self) -> PruningOptions {
        self.pruning
    }

    pub fn is_loaded(&self) -> bool {
        self.stores.is_some()
    }

    /// Whether a commit failed partway and the instance stopped serving
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Combined identifier of the loaded or last committed version
    pub fn last_commit_id(&self) -> CommitId {
        self.last_commit_id.clone()
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// Mounted keys in name order
    pub fn store_keys(&self) -> Vec<StoreKey> {
        self.registry.keys().cloned().collect()
    }

    /// Substore bound to `key`; `None` before load, after a failed commit,
    /// or for an unmounted key
    pub fn get_kv_store(&self, key: &StoreKey) -> Option<&dyn CommitKvStore> {
        self.usable_stores().ok()?.get(key).map(|store| &**store)
    }

    /// Substore mounted under `name`
    pub fn get_store_by_name(&self, name: &str) -> Option<&dyn CommitKvStore> {
        let key = self.registry.lookup(name)?;
        self.get_kv_store(key)
    }

    /// Current per-substore commit identifiers, in name order
    pub fn store_infos(&self) -> Vec<StoreInfo> {
        self.stores
            .as_ref()
            .map(store_infos)
            .unwrap_or_default()
    }

    /// Live substores, unless unloaded or failed
    pub(crate) fn usable_stores(&self) -> StoreResult<&StoreMap> {
        if let Some(cause) = &self.failure {
            return Err(StoreError::CommitFailed(cause.clone()));
        }
        self.stores.as_ref().ok_or(StoreError::NotLoaded)
    }

    pub(crate) fn ensure_unloaded(&self) -> StoreResult<()> {
        if self.is_loaded() {
            return Err(StoreError::AlreadyLoaded);
        }
        Ok(())
    }
}

pub(crate) fn store_infos(stores: &StoreMap) -> Vec<StoreInfo> {
    stores
        .iter()
        .map(|(key, store)| StoreInfo::new(key.name(), store.last_commit_id()))
        .collect()
}
