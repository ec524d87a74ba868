//! Core types for Canopy
//!
//! Defines the identifiers shared by the multistore and its substores.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash as StdHash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::traits::StoreResult;

/// Committed version number of a store. `0` means nothing committed yet.
pub type Version = i64;

/// 32-byte hash type
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Hash(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        Hash::from_slice(&bytes).ok_or(hex::FromHexError::InvalidStringLength)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", &self.to_hex()[..16])
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(0x{})", self.to_hex())
    }
}

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

/// Handle naming one mount slot of the multistore.
///
/// Every call to [`StoreKey::new`] produces a distinct handle, even for an
/// already-used name. Clones are the same handle. Equality and hashing
/// follow handle identity, never the name; the multistore rejects two
/// handles that share a name as a separate check.
#[derive(Clone)]
pub struct StoreKey {
    id: u64,
    name: Arc<str>,
}

impl StoreKey {
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            id: NEXT_KEY_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for StoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StoreKey {}

impl StdHash for StoreKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// Name first so maps keyed by StoreKey iterate in name order.
impl Ord for StoreKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for StoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreKey({}#{})", self.name, self.id)
    }
}

/// Kind of substore bound to a mount slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    /// Persistent, versioned Merkle key-value tree
    #[default]
    Tree,
    /// In-memory store cleared on every commit
    Transient,
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreType::Tree => write!(f, "tree"),
            StoreType::Transient => write!(f, "transient"),
        }
    }
}

/// Identifies one committed snapshot of a store
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CommitId {
    pub version: Version,
    pub hash: Vec<u8>,
}

impl CommitId {
    pub fn new(version: Version, hash: Vec<u8>) -> Self {
        Self { version, hash }
    }

    /// True for the "no commit yet" identifier.
    pub fn is_zero(&self) -> bool {
        self.version == 0 && self.hash.is_empty()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hash.is_empty() {
            write!(f, "v{} <empty>", self.version)
        } else {
            let hex = self.hash_hex();
            write!(f, "v{} 0x{}", self.version, &hex[..hex.len().min(16)])
        }
    }
}

impl fmt::Debug for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitId(v{}, 0x{})", self.version, self.hash_hex())
    }
}

/// Per-substore summary fed into the root hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub name: String,
    pub commit_id: CommitId,
}

impl StoreInfo {
    pub fn new(name: impl Into<String>, commit_id: CommitId) -> Self {
        Self {
            name: name.into(),
            commit_id,
        }
    }

    /// Canonical encoding hashed as the value of this store's leaf.
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hash_hex() {
        let hash = Hash([7u8; 32]);
        let parsed = Hash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, parsed);
        assert!(Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_store_key_identity() {
        let key1 = StoreKey::new("store1");
        let dup1 = StoreKey::new("store1");

        assert_eq!(key1, key1.clone());
        assert_ne!(key1, dup1);
        assert_eq!(key1.name(), dup1.name());

        let set: HashSet<StoreKey> = [key1.clone(), dup1, key1].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_store_key_orders_by_name() {
        let b = StoreKey::new("bravo");
        let a = StoreKey::new("alpha");
        let mut keys = vec![b.clone(), a.clone()];
        keys.sort();
        assert_eq!(keys, vec![a, b]);
    }

    #[test]
    fn test_zero_commit_id() {
        assert!(CommitId::default().is_zero());
        assert!(!CommitId::new(1, vec![]).is_zero());
        assert!(!CommitId::new(0, vec![1]).is_zero());
    }

    #[test]
    fn test_store_info_encoding_is_deterministic() {
        let info = StoreInfo::new("store1", CommitId::new(3, vec![1, 2, 3]));
        let bytes = info.to_bytes().unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(bytes, info.clone().to_bytes().unwrap());

        let other = StoreInfo::new("store1", CommitId::new(4, vec![1, 2, 3]));
        assert_ne!(bytes, other.to_bytes().unwrap());
    }

    #[test]
    fn test_store_type_serde() {
        let json = serde_json::to_string(&StoreType::Transient).unwrap();
        assert_eq!(json, "\"transient\"");
        let parsed: StoreType = serde_json::from_str("\"tree\"").unwrap();
        assert_eq!(parsed, StoreType::Tree);
    }
}
