//! Node application: database backend plus a configured multistore

use anyhow::{anyhow, Context};
use canopy_core::{
    CommitId, CommitKvStore, DatabaseBackend, NodeConfig, QueryRequest, QueryResponse,
    SharedDatabase, StoreKey, StoreResult, Version,
};
use canopy_multistore::{CommitInfo, MultiStore};
use canopy_state::{MemDatabase, SledDatabase};
use serde_json::json;
use tracing::{debug, info};

/// File name of the sled database inside `data_dir`
pub const DB_FILE: &str = "canopy.db";

/// Opened database backend
enum Backend {
    Sled(SledDatabase),
    Memory(MemDatabase),
}

impl Backend {
    fn open(config: &NodeConfig) -> StoreResult<Self> {
        match config.backend {
            DatabaseBackend::Sled => {
                std::fs::create_dir_all(&config.data_dir)?;
                let path = config.data_dir.join(DB_FILE);
                debug!("Opening sled database at {}", path.display());
                Ok(Backend::Sled(SledDatabase::open(path)?))
            }
            DatabaseBackend::Memory => Ok(Backend::Memory(MemDatabase::new())),
        }
    }

    fn shared(&self) -> SharedDatabase {
        match self {
            Backend::Sled(db) => db.shared(),
            Backend::Memory(db) => db.shared(),
        }
    }

    /// Independent database for a store mounted with `separate_db`
    fn separate(&self, name: &str) -> StoreResult<SharedDatabase> {
        match self {
            Backend::Sled(db) => Ok(db.tree(name)?.shared()),
            Backend::Memory(_) => Ok(MemDatabase::new().shared()),
        }
    }
}

/// A loaded multistore built from a [`NodeConfig`]
pub struct App {
    config: NodeConfig,
    store: MultiStore,
}

impl App {
    /// Open the backend and load the latest version
    pub fn load_latest(config: NodeConfig) -> anyhow::Result<Self> {
        let mut store = Self::mount(&config)?;
        store
            .load_latest_version()
            .context("failed to load latest version")?;
        Ok(Self::loaded(config, store))
    }

    /// Open the backend and load exactly `version`
    pub fn load_version(config: NodeConfig, version: Version) -> anyhow::Result<Self> {
        let mut store = Self::mount(&config)?;
        store
            .load_version(version)
            .with_context(|| format!("failed to load version {}", version))?;
        Ok(Self::loaded(config, store))
    }

    fn mount(config: &NodeConfig) -> anyhow::Result<MultiStore> {
        config.validate()?;
        let backend = Backend::open(config)
            .with_context(|| format!("failed to open {:?} database", config.backend))?;

        let mut store = MultiStore::new(backend.shared());
        store.set_pruning(config.pruning)?;
        for mount in &config.stores {
            let db = if mount.separate_db {
                Some(backend.separate(&mount.name)?)
            } else {
                None
            };
            store.mount_store_with_db(StoreKey::new(mount.name.as_str()), mount.store_type, db)?;
        }
        Ok(store)
    }

    fn loaded(config: NodeConfig, store: MultiStore) -> Self {
        info!(
            "{} ready at {} with {} stores",
            config.name,
            store.last_commit_id(),
            config.stores.len()
        );
        Self { config, store }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> &MultiStore {
        &self.store
    }

    pub fn last_commit_id(&self) -> CommitId {
        self.store.last_commit_id()
    }

    pub fn info(&self) -> anyhow::Result<CommitInfo> {
        Ok(self.store.commit_info()?)
    }

    /// Write `key` into the store named `store_name` and commit
    pub fn set(&mut self, store_name: &str, key: &[u8], value: &[u8]) -> anyhow::Result<CommitId> {
        self.substore(store_name)?.set(key, value)?;
        self.commit()
    }

    /// Remove `key` from the store named `store_name` and commit
    pub fn delete(&mut self, store_name: &str, key: &[u8]) -> anyhow::Result<CommitId> {
        self.substore(store_name)?.delete(key)?;
        self.commit()
    }

    pub fn commit(&mut self) -> anyhow::Result<CommitId> {
        Ok(self.store.commit()?)
    }

    pub fn query(&self, req: &QueryRequest) -> QueryResponse {
        self.store.query(req)
    }

    fn substore(&self, name: &str) -> anyhow::Result<&dyn CommitKvStore> {
        self.store
            .get_store_by_name(name)
            .ok_or_else(|| anyhow!("no store mounted as {:?}", name))
    }
}

/// JSON rendering of a commit identifier
pub fn commit_id_json(id: &CommitId) -> serde_json::Value {
    json!({
        "version": id.version,
        "hash": id.hash_hex(),
    })
}

/// JSON rendering of the multistore identifier and its per-store parts
pub fn commit_info_json(id: &CommitId, info: &CommitInfo) -> serde_json::Value {
    let stores: Vec<serde_json::Value> = info
        .store_infos
        .iter()
        .map(|store| {
            json!({
                "name": store.name,
                "commit_id": commit_id_json(&store.commit_id),
            })
        })
        .collect();
    json!({
        "commit_id": commit_id_json(id),
        "stores": stores,
    })
}

/// JSON rendering of a query response
pub fn query_response_json(res: &QueryResponse) -> serde_json::Value {
    let value = res.value.as_ref().map(|v| {
        json!({
            "utf8": std::str::from_utf8(v).ok(),
            "hex": hex::encode(v),
        })
    });
    let proof = res.proof.as_ref().map(|p| {
        json!({
            "root": p.root.to_hex(),
            "path_len": p.path.len(),
        })
    });
    json!({
        "code": res.code.as_u32(),
        "status": res.code.to_string(),
        "value": value,
        "proof": proof,
        "height": res.height,
        "log": res.log,
    })
}
