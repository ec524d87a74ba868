//! Persistent database backed by sled

use canopy_core::{BatchOp, Database, SharedDatabase, StoreError, StoreResult, WriteBatch};
use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;

/// sled-backed database.
///
/// Wraps one sled tree. [`SledDatabase::tree`] opens further independent
/// namespaces inside the same sled file, used for substores mounted with
/// their own database.
#[derive(Clone)]
pub struct SledDatabase {
    db: Db,
    tree: Tree,
}

impl SledDatabase {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path).map_err(|e| StoreError::Storage(e.to_string()))?;
        let tree: Tree = (*db).clone();
        Ok(Self { db, tree })
    }

    /// Temporary database removed on drop, for tests
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let tree: Tree = (*db).clone();
        Ok(Self { db, tree })
    }

    /// Independent namespace in the same sled file
    pub fn tree(&self, name: &str) -> StoreResult<Self> {
        let tree = self
            .db
            .open_tree(name)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(Self {
            db: self.db.clone(),
            tree,
        })
    }

    pub fn shared(&self) -> SharedDatabase {
        Arc::new(self.clone())
    }
}

impl Database for SledDatabase {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.tree
            .get(key)
            .map(|opt| opt.map(|v| v.to_vec()))
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        self.tree
            .contains_key(key)
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.tree
            .insert(key, value)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.tree
            .remove(key)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.tree
            .scan_prefix(prefix)
            .map(|result| result.map(|(key, value)| (key.to_vec(), value.to_vec())))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn write(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut sled_batch = sled::Batch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Set { key, value } => sled_batch.insert(key, value),
                BatchOp::Delete { key } => sled_batch.remove(key),
            }
        }

        self.tree
            .apply_batch(sled_batch)
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn flush(&self) -> StoreResult<()> {
        self.db
            .flush()
            .map(|_| ())
            .map_err(|e| StoreError::Storage(e.to_string()))
    }
}
