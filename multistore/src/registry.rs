//! Store key registry: which substores are mounted, and how

use canopy_core::{SharedDatabase, StoreError, StoreKey, StoreResult, StoreType};
use canopy_state::PrefixDatabase;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// How a mounted key is bound at load time
#[derive(Clone)]
pub struct MountParams {
    pub store_type: StoreType,
    /// Independent database; `None` shares the multistore's database
    /// under a name-derived prefix
    pub db: Option<SharedDatabase>,
}

impl MountParams {
    pub fn new(store_type: StoreType, db: Option<SharedDatabase>) -> Self {
        Self { store_type, db }
    }

    /// Database the substore for `name` persists into
    pub fn database(&self, shared: &SharedDatabase, name: &str) -> SharedDatabase {
        match &self.db {
            Some(db) => db.clone(),
            None => Arc::new(PrefixDatabase::for_store(shared.clone(), name)),
        }
    }
}

impl std::fmt::Debug for MountParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountParams")
            .field("store_type", &self.store_type)
            .field("separate_db", &self.db.is_some())
            .finish()
    }
}

/// Mounted keys, iterated in name order
#[derive(Debug, Default)]
pub struct StoreRegistry {
    mounts: BTreeMap<StoreKey, MountParams>,
    by_name: HashMap<String, StoreKey>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key`.
    ///
    /// Rejects the same handle twice and, separately, a different handle
    /// carrying an already-mounted name.
    pub fn mount(&mut self, key: StoreKey, params: MountParams) -> StoreResult<()> {
        let name = key.name();
        if name.is_empty() || name.contains('/') {
            return Err(StoreError::ConfigError(format!(
                "store name {:?} cannot be routed",
                name
            )));
        }
        if self.mounts.contains_key(&key) {
            return Err(StoreError::DuplicateMount(name.to_string()));
        }
        if self.by_name.contains_key(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }

        self.by_name.insert(name.to_string(), key.clone());
        self.mounts.insert(key, params);
        Ok(())
    }

    /// Key mounted under `name`
    pub fn lookup(&self, name: &str) -> Option<&StoreKey> {
        self.by_name.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StoreKey, &MountParams)> {
        self.mounts.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StoreKey> {
        self.mounts.keys()
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}
