//! In-memory database for testing and throwaway nodes

use canopy_core::{BatchOp, Database, SharedDatabase, StoreResult, WriteBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory ordered database.
///
/// Clones share the same data, so a clone handed to a new multistore
/// instance sees everything the previous instance committed.
#[derive(Clone, Default)]
pub struct MemDatabase {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        let db = Self::new();
        db.data.write().extend(data);
        db
    }

    /// Shared handle over the same data
    pub fn shared(&self) -> SharedDatabase {
        Arc::new(self.clone())
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// All keys, for inspecting layouts in tests
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.data.read().keys().cloned().collect()
    }
}

impl Database for MemDatabase {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.data.read().contains_key(key))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let data = self.data.read();
        let entries = data
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(entries)
    }

    fn write(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut data = self.data.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Set { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}
