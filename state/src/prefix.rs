//! Key-prefix namespacing inside a shared database

use canopy_core::{BatchOp, Database, SharedDatabase, StoreResult, WriteBatch};

/// View of a shared database restricted to keys under one prefix.
///
/// Keys passed in and returned are relative to the prefix.
#[derive(Clone)]
pub struct PrefixDatabase {
    inner: SharedDatabase,
    prefix: Vec<u8>,
}

impl PrefixDatabase {
    pub fn new(inner: SharedDatabase, prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    /// Namespace of the substore mounted as `name`
    pub fn for_store(inner: SharedDatabase, name: &str) -> Self {
        Self::new(inner, store_prefix(name))
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }
}

/// Prefix under which a named substore lives in the shared database
pub fn store_prefix(name: &str) -> Vec<u8> {
    format!("s/k:{}/", name).into_bytes()
}

impl Database for PrefixDatabase {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(&self.full_key(key))
    }

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        self.inner.has(&self.full_key(key))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.inner.set(&self.full_key(key), value)
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.inner.delete(&self.full_key(key))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let strip = self.prefix.len();
        let entries = self
            .inner
            .scan_prefix(&self.full_key(prefix))?
            .into_iter()
            .map(|(key, value)| (key[strip..].to_vec(), value))
            .collect();
        Ok(entries)
    }

    fn write(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut prefixed = WriteBatch::new();
        for op in batch.into_ops() {
            match op {
                BatchOp::Set { key, value } => prefixed.set(self.full_key(&key), value),
                BatchOp::Delete { key } => prefixed.delete(self.full_key(&key)),
            }
        }
        self.inner.write(prefixed)
    }

    fn flush(&self) -> StoreResult<()> {
        self.inner.flush()
    }
}
