//! Core traits defining Canopy interfaces
//!
//! These traits define the contracts between the multistore, its substores
//! and the byte-oriented databases they persist into.

use crate::query::{QueryRequest, QueryResponse};
use crate::types::*;
use std::sync::Arc;

/// Result type for Canopy operations
pub type StoreResult<T> = Result<T, crate::error::StoreError>;

/// Single write in a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Set { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Ordered group of writes applied atomically by [`Database::write`]
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Set {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete { key: key.into() });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Byte-oriented database a substore persists into
pub trait Database: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Check if a key exists
    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Set a value
    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Delete a key
    fn delete(&self, key: &[u8]) -> StoreResult<()>;

    /// All pairs whose key starts with `prefix`, in ascending key order
    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply a batch of writes atomically
    fn write(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Make previous writes durable
    fn flush(&self) -> StoreResult<()>;
}

/// Database handle shared between the multistore and its substores
pub type SharedDatabase = Arc<dyn Database>;

/// Point reads and writes against a substore's working state
pub trait KvStore: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Check if a key exists
    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Set a value
    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Delete a key
    fn delete(&self, key: &[u8]) -> StoreResult<()>;
}

/// Stores that can commit their working state as a new version
pub trait Committer: Send + Sync {
    /// Persist the working state and return the new commit identifier
    fn commit(&self) -> StoreResult<CommitId>;

    /// Identifier of the most recent commit (or of the loaded version)
    fn last_commit_id(&self) -> CommitId;
}

/// Stores that answer path-addressed queries
pub trait Queryable: Send + Sync {
    /// `req.path` holds only the part below the store's own segment
    fn query(&self, req: &QueryRequest) -> QueryResponse;
}

/// Capability every mountable substore implements
pub trait CommitKvStore: KvStore + Committer + Queryable {
    fn store_type(&self) -> StoreType;
}
