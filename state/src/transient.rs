//! Transient store: per-block scratch state

use canopy_core::{
    CommitId, CommitKvStore, Committer, KvStore, QueryRequest, QueryResponse, Queryable,
    StoreError, StoreResult, StoreType, Version,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory store whose contents are dropped on every commit.
///
/// It keeps no history, so it can be loaded at any version. Its version
/// counter advances with the other substores and its commit hash is empty.
pub struct TransientStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    version: RwLock<Version>,
}

impl TransientStore {
    pub fn new(version: Version) -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            version: RwLock::new(version),
        }
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KvStore for TransientStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey("empty key".to_string()));
        }
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.data.write().remove(key);
        Ok(())
    }
}

impl Committer for TransientStore {
    fn commit(&self) -> StoreResult<CommitId> {
        let mut version = self.version.write();
        *version += 1;
        self.data.write().clear();
        Ok(CommitId::new(*version, Vec::new()))
    }

    fn last_commit_id(&self) -> CommitId {
        CommitId::new(*self.version.read(), Vec::new())
    }
}

impl Queryable for TransientStore {
    fn query(&self, _req: &QueryRequest) -> QueryResponse {
        QueryResponse::unknown_request("transient stores do not answer queries")
    }
}

impl CommitKvStore for TransientStore {
    fn store_type(&self) -> StoreType {
        StoreType::Transient
    }
}
