//! Persistent, versioned Merkle key-value store
//!
//! Every commit writes a full snapshot of the working set under its version,
//! together with that version's root hash and the latest-version marker, in
//! one atomic batch. Layout inside the store's database:
//!
//! - `m/latest`           → latest committed version (big-endian i64)
//! - `r/<version>`        → commit hash of that version
//! - `v/<version>/<key>`  → value of `key` at that version

use canopy_core::{
    CommitId, CommitKvStore, Committer, Database, KvStore, PruningOptions, QueryRequest,
    QueryResponse, Queryable, ResponseCode, SharedDatabase, StoreError, StoreResult, StoreType,
    Version, WriteBatch,
};
use canopy_crypto::MerkleTree;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::{debug, info};

const LATEST_KEY: &[u8] = b"m/latest";
const ROOT_PREFIX: &[u8] = b"r/";
const SNAPSHOT_PREFIX: &[u8] = b"v/";

fn version_bytes(version: Version) -> [u8; 8] {
    (version as u64).to_be_bytes()
}

fn root_key(version: Version) -> Vec<u8> {
    [ROOT_PREFIX, &version_bytes(version)[..]].concat()
}

fn snapshot_prefix(version: Version) -> Vec<u8> {
    [SNAPSHOT_PREFIX, &version_bytes(version)[..], &b"/"[..]].concat()
}

fn snapshot_key(version: Version, key: &[u8]) -> Vec<u8> {
    [&snapshot_prefix(version)[..], key].concat()
}

fn decode_version(bytes: &[u8]) -> StoreResult<Version> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::StateCorruption(format!("bad version encoding: {:?}", bytes)))?;
    Ok(u64::from_be_bytes(arr) as Version)
}

/// Commit hash of a key/value set; empty when the set is empty
pub fn commit_hash(entries: &BTreeMap<Vec<u8>, Vec<u8>>) -> Vec<u8> {
    if entries.is_empty() {
        return Vec::new();
    }
    merkle_tree(entries).root().to_vec()
}

fn merkle_tree(entries: &BTreeMap<Vec<u8>, Vec<u8>>) -> MerkleTree {
    MerkleTree::from_pairs(entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice())))
}

/// Versioned Merkle key-value store
pub struct TreeStore {
    name: String,
    db: SharedDatabase,
    pruning: PruningOptions,
    working: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    last_commit: RwLock<CommitId>,
}

impl TreeStore {
    /// Latest version committed into `db`, `0` if none
    pub fn latest_version(db: &dyn Database) -> StoreResult<Version> {
        match db.get(LATEST_KEY)? {
            Some(bytes) => decode_version(&bytes),
            None => Ok(0),
        }
    }

    /// All versions still present in `db`, ascending
    pub fn available_versions(db: &dyn Database) -> StoreResult<Vec<Version>> {
        db.scan_prefix(ROOT_PREFIX)?
            .iter()
            .map(|(key, _)| decode_version(&key[ROOT_PREFIX.len()..]))
            .collect()
    }

    /// Load the store at its own latest version
    pub fn load_latest(
        name: impl Into<String>,
        db: SharedDatabase,
        pruning: PruningOptions,
    ) -> StoreResult<Self> {
        let latest = Self::latest_version(db.as_ref())?;
        Self::load(name, db, latest, pruning)
    }

    /// Load the store at exactly `version`.
    ///
    /// Version `0` is the empty tree. Fails with `VersionNotFound` when the
    /// version was never committed, was discarded by a rollback, or was pruned.
    pub fn load(
        name: impl Into<String>,
        db: SharedDatabase,
        version: Version,
        pruning: PruningOptions,
    ) -> StoreResult<Self> {
        let name = name.into();
        if version < 0 {
            return Err(StoreError::InvalidVersion(version));
        }

        let (working, last_commit) = if version == 0 {
            (BTreeMap::new(), CommitId::default())
        } else {
            let hash = db.get(&root_key(version))?.ok_or_else(|| StoreError::VersionNotFound {
                store: name.clone(),
                version,
            })?;
            let entries = read_snapshot(db.as_ref(), version)?;
            if commit_hash(&entries) != hash {
                return Err(StoreError::StateCorruption(format!(
                    "store {} version {} does not match its recorded hash",
                    name, version
                )));
            }
            (entries, CommitId::new(version, hash))
        };

        debug!(
            "Loaded tree store {} at {} ({} keys)",
            name,
            last_commit,
            working.len()
        );

        Ok(Self {
            name,
            db,
            pruning,
            working: RwLock::new(working),
            last_commit: RwLock::new(last_commit),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pruning(&self) -> PruningOptions {
        self.pruning
    }

    /// Whether `version` can be read; version `0` always can
    pub fn has_version(&self, version: Version) -> StoreResult<bool> {
        if version == 0 {
            return Ok(true);
        }
        self.db.has(&root_key(version))
    }

    /// Value of `key` as committed at `version`
    pub fn get_versioned(&self, key: &[u8], version: Version) -> StoreResult<Option<Vec<u8>>> {
        if version == 0 {
            return Ok(None);
        }
        self.db.get(&snapshot_key(version, key))
    }

    /// Number of keys in the working set
    pub fn len(&self) -> usize {
        self.working.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.read().is_empty()
    }

    /// Queue deletion of every record of `version`
    fn delete_version(&self, batch: &mut WriteBatch, version: Version) -> StoreResult<()> {
        for (key, _) in self.db.scan_prefix(&snapshot_prefix(version))? {
            batch.delete(key);
        }
        batch.delete(root_key(version));
        Ok(())
    }

    fn query_key(&self, key: &[u8], height: Version, prove: bool) -> StoreResult<QueryResponse> {
        if !prove {
            let value = self.get_versioned(key, height)?;
            return Ok(QueryResponse::ok(value, height));
        }

        let entries = read_snapshot(self.db.as_ref(), height)?;
        let Some(index) = entries.keys().position(|k| k.as_slice() == key) else {
            // No absence proofs: an absent key is answered without one
            return Ok(QueryResponse::ok(None, height));
        };
        let value = entries[key].clone();
        let proof = merkle_tree(&entries).prove_pair(index, key, &value);
        Ok(QueryResponse::ok(Some(value), height).with_proof(proof))
    }

    fn query_subspace(&self, prefix: &[u8], height: Version) -> StoreResult<QueryResponse> {
        let pairs: Vec<(Vec<u8>, Vec<u8>)> = if height == 0 {
            Vec::new()
        } else {
            let scan_prefix = snapshot_key(height, prefix);
            let strip = snapshot_prefix(height).len();
            self.db
                .scan_prefix(&scan_prefix)?
                .into_iter()
                .map(|(key, value)| (key[strip..].to_vec(), value))
                .collect()
        };
        let encoded = bincode::serialize(&pairs)?;
        Ok(QueryResponse::ok(Some(encoded), height))
    }
}

fn read_snapshot(db: &dyn Database, version: Version) -> StoreResult<BTreeMap<Vec<u8>, Vec<u8>>> {
    if version == 0 {
        return Ok(BTreeMap::new());
    }
    let strip = snapshot_prefix(version).len();
    let entries = db
        .scan_prefix(&snapshot_prefix(version))?
        .into_iter()
        .map(|(key, value)| (key[strip..].to_vec(), value))
        .collect();
    Ok(entries)
}

impl KvStore for TreeStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.working.read().get(key).cloned())
    }

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.working.read().contains_key(key))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey("empty key".to_string()));
        }
        self.working.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.working.write().remove(key);
        Ok(())
    }
}

impl Committer for TreeStore {
    fn commit(&self) -> StoreResult<CommitId> {
        let working = self.working.read();
        let mut last_commit = self.last_commit.write();
        let version = last_commit.version + 1;

        let mut batch = WriteBatch::new();
        let (stale, history): (Vec<Version>, Vec<Version>) =
            Self::available_versions(self.db.as_ref())?
                .into_iter()
                .partition(|v| *v >= version);

        // A commit after loading an older version replaces the newer branch.
        if !stale.is_empty() {
            info!(
                "Store {} discarding versions {:?} after rollback to {}",
                self.name, stale, last_commit.version
            );
        }
        for v in stale {
            self.delete_version(&mut batch, v)?;
        }

        for (key, value) in working.iter() {
            batch.set(snapshot_key(version, key), value.clone());
        }
        let hash = commit_hash(&working);
        batch.set(root_key(version), hash.clone());
        batch.set(LATEST_KEY.to_vec(), version_bytes(version).to_vec());

        for v in history
            .into_iter()
            .filter(|v| self.pruning.should_prune(*v, version))
        {
            debug!("Store {} pruning version {}", self.name, v);
            self.delete_version(&mut batch, v)?;
        }

        self.db.write(batch)?;
        self.db.flush()?;

        *last_commit = CommitId::new(version, hash);
        debug!("Store {} committed {}", self.name, last_commit);
        Ok(last_commit.clone())
    }

    fn last_commit_id(&self) -> CommitId {
        self.last_commit.read().clone()
    }
}

impl Queryable for TreeStore {
    fn query(&self, req: &QueryRequest) -> QueryResponse {
        let latest = self.last_commit.read().version;
        let height = if req.height == 0 { latest } else { req.height };

        if height < 0 || height > latest {
            return QueryResponse::error(
                ResponseCode::InvalidHeight,
                format!("height {} outside committed range 0..={}", height, latest),
            );
        }
        match self.has_version(height) {
            Ok(true) => {}
            Ok(false) => {
                return QueryResponse::error(
                    ResponseCode::InvalidHeight,
                    format!("version {} is no longer available", height),
                )
            }
            Err(e) => return QueryResponse::error(ResponseCode::Internal, e.to_string()),
        }

        let result = match req.path.as_str() {
            "/key" => self.query_key(&req.data, height, req.prove),
            "/subspace" => self.query_subspace(&req.data, height),
            other => {
                return QueryResponse::unknown_request(format!("unexpected query path: {}", other))
            }
        };

        result.unwrap_or_else(|e| QueryResponse::error(ResponseCode::Internal, e.to_string()))
    }
}

impl CommitKvStore for TreeStore {
    fn store_type(&self) -> StoreType {
        StoreType::Tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemDatabase;
    use crate::persistent::SledDatabase;
    use canopy_crypto::verify_proof_against;
    use tempfile::TempDir;

    fn fresh(db: &MemDatabase) -> TreeStore {
        TreeStore::load_latest("test", db.shared(), PruningOptions::nothing()).unwrap()
    }

    #[test]
    fn test_new_store_is_empty() {
        let db = MemDatabase::new();
        let store = fresh(&db);

        assert!(store.last_commit_id().is_zero());
        assert!(store.is_empty());
        assert_eq!(TreeStore::latest_version(&db).unwrap(), 0);
    }

    #[test]
    fn test_commit_advances_version() {
        let db = MemDatabase::new();
        let store = fresh(&db);

        for i in 1..=3 {
            let id = store.commit().unwrap();
            assert_eq!(id.version, i);
            assert_eq!(store.last_commit_id(), id);
        }
        assert_eq!(TreeStore::latest_version(&db).unwrap(), 3);
        assert_eq!(TreeStore::available_versions(&db).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_commit_hash_tracks_contents() {
        let db = MemDatabase::new();
        let store = fresh(&db);

        let empty = store.commit().unwrap();
        assert!(empty.hash.is_empty());

        store.set(b"wind", b"blows").unwrap();
        let first = store.commit().unwrap();
        assert_eq!(first.hash.len(), 32);

        let unchanged = store.commit().unwrap();
        assert_eq!(first.hash, unchanged.hash);

        store.set(b"wind", b"howls").unwrap();
        let changed = store.commit().unwrap();
        assert_ne!(first.hash, changed.hash);
    }

    #[test]
    fn test_reload_restores_working_set() {
        let db = MemDatabase::new();
        let store = fresh(&db);
        store.set(b"k1", b"v1").unwrap();
        store.set(b"k2", b"v2").unwrap();
        let id = store.commit().unwrap();

        // Uncommitted writes are lost on reload
        store.set(b"k3", b"v3").unwrap();

        let reloaded = fresh(&db);
        assert_eq!(reloaded.last_commit_id(), id);
        assert_eq!(reloaded.get(b"k1").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(reloaded.get(b"k3").unwrap(), None);
    }

    #[test]
    fn test_load_specific_version() {
        let db = MemDatabase::new();
        let store = fresh(&db);
        store.set(b"k", b"one").unwrap();
        let v1 = store.commit().unwrap();
        store.set(b"k", b"two").unwrap();
        store.commit().unwrap();

        let old = TreeStore::load("test", db.shared(), 1, PruningOptions::nothing()).unwrap();
        assert_eq!(old.last_commit_id(), v1);
        assert_eq!(old.get(b"k").unwrap(), Some(b"one".to_vec()));
    }

    #[test]
    fn test_load_missing_version() {
        let db = MemDatabase::new();
        let store = fresh(&db);
        store.commit().unwrap();

        let err = TreeStore::load("test", db.shared(), 5, PruningOptions::nothing())
            .err()
            .unwrap();
        assert!(err.is_not_found());

        let err = TreeStore::load("test", db.shared(), -1, PruningOptions::nothing())
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::InvalidVersion(-1)));
    }

    #[test]
    fn test_rollback_discards_newer_versions() {
        let db = MemDatabase::new();
        let store = fresh(&db);
        for i in 0..4u8 {
            store.set(b"k", &[i]).unwrap();
            store.commit().unwrap();
        }

        let rolled = TreeStore::load("test", db.shared(), 2, PruningOptions::nothing()).unwrap();
        // Loading alone keeps the newer history
        assert_eq!(TreeStore::latest_version(&db).unwrap(), 4);

        rolled.set(b"k", b"fork").unwrap();
        let id = rolled.commit().unwrap();
        assert_eq!(id.version, 3);
        assert_eq!(TreeStore::available_versions(&db).unwrap(), vec![1, 2, 3]);

        let latest = fresh(&db);
        assert_eq!(latest.last_commit_id(), id);
        assert_eq!(latest.get(b"k").unwrap(), Some(b"fork".to_vec()));
        assert!(TreeStore::load("test", db.shared(), 4, PruningOptions::nothing()).is_err());
    }

    #[test]
    fn test_pruning_keeps_recent_and_checkpoints() {
        let db = MemDatabase::new();
        let store =
            TreeStore::load_latest("test", db.shared(), PruningOptions::new(2, 3)).unwrap();
        for _ in 0..6 {
            store.commit().unwrap();
        }

        // 6 and 5 are recent, 3 is a checkpoint
        assert_eq!(TreeStore::available_versions(&db).unwrap(), vec![3, 5, 6]);
        let err = TreeStore::load("test", db.shared(), 2, PruningOptions::nothing())
            .err()
            .unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_pruning_catches_up_on_existing_history() {
        let db = MemDatabase::new();
        let store = fresh(&db);
        for _ in 0..5 {
            store.commit().unwrap();
        }
        assert_eq!(TreeStore::available_versions(&db).unwrap(), vec![1, 2, 3, 4, 5]);

        // Turning pruning on later drops everything outside the window at once
        let store =
            TreeStore::load_latest("test", db.shared(), PruningOptions::new(2, 2)).unwrap();
        store.commit().unwrap();
        assert_eq!(TreeStore::available_versions(&db).unwrap(), vec![2, 4, 5, 6]);
    }

    #[test]
    fn test_corrupted_snapshot_detected() {
        let db = MemDatabase::new();
        let store = fresh(&db);
        store.set(b"k", b"v").unwrap();
        store.commit().unwrap();

        db.set(&snapshot_key(1, b"k"), b"tampered").unwrap();
        let err = TreeStore::load("test", db.shared(), 1, PruningOptions::nothing())
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::StateCorruption(_)));
    }

    #[test]
    fn test_empty_key_rejected() {
        let db = MemDatabase::new();
        let store = fresh(&db);
        assert!(matches!(store.set(b"", b"v"), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_query_key_at_height() {
        let db = MemDatabase::new();
        let store = fresh(&db);
        store.set(b"k", b"old").unwrap();
        store.commit().unwrap();
        store.set(b"k", b"new").unwrap();
        store.commit().unwrap();
        store.set(b"k", b"uncommitted").unwrap();

        let latest = store.query(&QueryRequest::new("/key", b"k".to_vec()));
        assert_eq!(latest.code, ResponseCode::Ok);
        assert_eq!(latest.value, Some(b"new".to_vec()));
        assert_eq!(latest.height, 2);

        let old = store.query(&QueryRequest::new("/key", b"k".to_vec()).at_height(1));
        assert_eq!(old.value, Some(b"old".to_vec()));
        assert_eq!(old.height, 1);

        let missing = store.query(&QueryRequest::new("/key", b"nope".to_vec()));
        assert_eq!(missing.code, ResponseCode::Ok);
        assert_eq!(missing.value, None);

        let future = store.query(&QueryRequest::new("/key", b"k".to_vec()).at_height(3));
        assert_eq!(future.code, ResponseCode::InvalidHeight);

        let bad = store.query(&QueryRequest::new("/nope", b"k".to_vec()));
        assert_eq!(bad.code, ResponseCode::UnknownRequest);
    }

    #[test]
    fn test_query_before_first_commit() {
        let db = MemDatabase::new();
        let store = fresh(&db);
        store.set(b"k", b"v").unwrap();

        let res = store.query(&QueryRequest::new("/key", b"k".to_vec()).with_proof());
        assert_eq!(res.code, ResponseCode::Ok);
        assert_eq!(res.value, None);
        assert_eq!(res.height, 0);
    }

    #[test]
    fn test_query_with_proof() {
        let db = MemDatabase::new();
        let store = fresh(&db);
        for (k, v) in [(b"a", b"1"), (b"b", b"2"), (b"c", b"3")] {
            store.set(k, v).unwrap();
        }
        let id = store.commit().unwrap();

        let res = store.query(&QueryRequest::new("/key", b"b".to_vec()).with_proof());
        assert_eq!(res.value, Some(b"2".to_vec()));
        let proof = res.proof.unwrap();
        assert!(verify_proof_against(&proof, &id.hash));

        let absent = store.query(&QueryRequest::new("/key", b"zz".to_vec()).with_proof());
        assert_eq!(absent.code, ResponseCode::Ok);
        assert!(absent.proof.is_none());
    }

    #[test]
    fn test_query_subspace() {
        let db = MemDatabase::new();
        let store = fresh(&db);
        store.set(b"acc/1", b"10").unwrap();
        store.set(b"acc/2", b"20").unwrap();
        store.set(b"cfg", b"x").unwrap();
        store.commit().unwrap();

        let res = store.query(&QueryRequest::new("/subspace", b"acc/".to_vec()));
        assert_eq!(res.code, ResponseCode::Ok);
        let pairs: Vec<(Vec<u8>, Vec<u8>)> = bincode::deserialize(&res.value.unwrap()).unwrap();
        assert_eq!(
            pairs,
            vec![
                (b"acc/1".to_vec(), b"10".to_vec()),
                (b"acc/2".to_vec(), b"20".to_vec()),
            ]
        );
    }

    #[test]
    fn test_query_pruned_height() {
        let db = MemDatabase::new();
        let store =
            TreeStore::load_latest("test", db.shared(), PruningOptions::new(1, 0)).unwrap();
        store.set(b"k", b"v").unwrap();
        store.commit().unwrap();
        store.commit().unwrap();

        let res = store.query(&QueryRequest::new("/key", b"k".to_vec()).at_height(1));
        assert_eq!(res.code, ResponseCode::InvalidHeight);
    }

    #[test]
    fn test_sled_backed_reopen() {
        let tmp = TempDir::new().unwrap();
        let id = {
            let db = SledDatabase::open(tmp.path()).unwrap();
            let store =
                TreeStore::load_latest("test", db.shared(), PruningOptions::nothing()).unwrap();
            store.set(b"k", b"v").unwrap();
            store.commit().unwrap()
        };

        let db = SledDatabase::open(tmp.path()).unwrap();
        let store = TreeStore::load_latest("test", db.shared(), PruningOptions::nothing()).unwrap();
        assert_eq!(store.last_commit_id(), id);
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}
