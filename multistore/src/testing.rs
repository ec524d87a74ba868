//! Shared fixtures for multistore tests

use canopy_core::{
    CommitId, Database, SharedDatabase, StoreError, StoreKey, StoreResult, StoreType, Version,
    WriteBatch,
};
use canopy_state::MemDatabase;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::commit::hash_store_infos;
use crate::store::MultiStore;

/// Unloaded multistore with tree stores store1, store2 and store3 mounted
pub(crate) fn new_multistore_with_mounts(db: &MemDatabase) -> MultiStore {
    let mut store = MultiStore::new(db.shared());
    for name in ["store1", "store2", "store3"] {
        store
            .mount_store(StoreKey::new(name), StoreType::Tree)
            .unwrap();
    }
    store
}

/// Commit identifier `store` should report at `version` for its current substores
pub(crate) fn expected_commit_id(store: &MultiStore, version: Version) -> CommitId {
    CommitId::new(version, hash_store_infos(&store.store_infos()).unwrap())
}

/// In-memory database whose batch writes can be switched to fail
#[derive(Clone, Default)]
pub(crate) struct FlakyDatabase {
    inner: MemDatabase,
    failing: Arc<AtomicBool>,
}

impl FlakyDatabase {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn shared(&self) -> SharedDatabase {
        Arc::new(self.clone())
    }

    /// Data written so far, without the failure switch
    pub(crate) fn inner(&self) -> &MemDatabase {
        &self.inner
    }

    pub(crate) fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl Database for FlakyDatabase {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.inner.set(key, value)
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.inner.delete(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.inner.scan_prefix(prefix)
    }

    fn write(&self, batch: WriteBatch) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("disk full".to_string()));
        }
        self.inner.write(batch)
    }

    fn flush(&self) -> StoreResult<()> {
        self.inner.flush()
    }
}
