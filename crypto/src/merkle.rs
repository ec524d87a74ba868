//! Binary Merkle trees over key/value leaves
//!
//! A tree is built from pairs in the caller's order; stores pass pairs in
//! ascending key order so the root is reproducible. The multistore root is
//! the same construction over `name → encoded StoreInfo`, sorted by name.

use canopy_core::{Hash, MerkleProof, ProofSide};
use std::collections::BTreeMap;

use crate::hashing::{inner_hash, kv_leaf_hash, merkle_root};

/// Binary Merkle tree supporting inclusion proofs.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: Hash,
    /// Level 0 = leaves, last element = root.
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build a tree from leaf hashes. An empty list has root [`Hash::ZERO`].
    pub fn from_leaves(leaves: Vec<Hash>) -> Self {
        if leaves.is_empty() {
            return Self {
                root: Hash::ZERO,
                levels: vec![],
            };
        }

        let mut levels: Vec<Vec<Hash>> = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next: Vec<Hash> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => inner_hash(left, right),
                    [single] => inner_hash(single, single),
                    _ => unreachable!("chunks(2) yields one or two items"),
                })
                .collect();
            levels.push(next);
        }

        let root = levels[levels.len() - 1][0];
        Self { root, levels }
    }

    /// Build a tree over key/value pairs in iteration order.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
    {
        let leaves = pairs
            .into_iter()
            .map(|(key, value)| kv_leaf_hash(key, value))
            .collect();
        Self::from_leaves(leaves)
    }

    pub fn root(&self) -> Hash {
        self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Sibling path for the leaf at `index`, from leaf to root.
    pub fn path(&self, index: usize) -> Option<Vec<(Hash, ProofSide)>> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut path = Vec::with_capacity(self.levels.len() - 1);
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_idx = idx ^ 1;
            // Odd level: the last node is paired with itself
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            let side = if idx % 2 == 0 {
                ProofSide::Right
            } else {
                ProofSide::Left
            };
            path.push((sibling, side));
            idx /= 2;
        }

        Some(path)
    }

    /// Inclusion proof for the pair stored at leaf `index`.
    ///
    /// The caller supplies the pair; a mismatched pair yields a proof that
    /// fails [`verify_proof`].
    pub fn prove_pair(&self, index: usize, key: &[u8], value: &[u8]) -> Option<MerkleProof> {
        let path = self.path(index)?;
        Some(MerkleProof {
            key: key.to_vec(),
            value: value.to_vec(),
            path,
            root: self.root,
        })
    }
}

/// Recompute the root from the proven pair and its path.
pub fn verify_proof(proof: &MerkleProof) -> bool {
    let mut current = kv_leaf_hash(&proof.key, &proof.value);
    for (sibling, side) in &proof.path {
        current = match side {
            ProofSide::Left => inner_hash(sibling, &current),
            ProofSide::Right => inner_hash(&current, sibling),
        };
    }
    current == proof.root
}

/// Verify a proof against a commit hash published by a store.
pub fn verify_proof_against(proof: &MerkleProof, root: &[u8]) -> bool {
    proof.root.as_bytes()[..] == *root && verify_proof(proof)
}

/// Merkle hash of a string-keyed map; leaves are ordered by key.
pub fn simple_hash_from_map(map: &BTreeMap<String, Vec<u8>>) -> Hash {
    let leaves: Vec<Hash> = map
        .iter()
        .map(|(key, value)| kv_leaf_hash(key.as_bytes(), value))
        .collect();
    merkle_root(&leaves)
}
