//! Hashing functions using BLAKE3

use canopy_core::Hash;

/// Domain prefix for leaf nodes
const LEAF_PREFIX: u8 = 0x00;
/// Domain prefix for inner nodes
const INNER_PREFIX: u8 = 0x01;

/// Compute BLAKE3 hash of data
pub fn hash(data: &[u8]) -> Hash {
    let hash = blake3::hash(data);
    Hash::from_bytes(*hash.as_bytes())
}

/// Hash multiple pieces of data
pub fn hash_multiple(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    let hash = hasher.finalize();
    Hash::from_bytes(*hash.as_bytes())
}

/// Hash of a Merkle leaf
pub fn leaf_hash(data: &[u8]) -> Hash {
    hash_multiple(&[&[LEAF_PREFIX], data])
}

/// Hash of a Merkle inner node
pub fn inner_hash(left: &Hash, right: &Hash) -> Hash {
    hash_multiple(&[&[INNER_PREFIX], left.as_bytes(), right.as_bytes()])
}

/// Leaf hash of a key/value pair.
///
/// The key is length-prefixed and the value enters as its own hash, so
/// `(ab, c)` and `(a, bc)` never collide.
pub fn kv_leaf_hash(key: &[u8], value: &[u8]) -> Hash {
    let value_hash = hash(value);
    let key_len = (key.len() as u64).to_be_bytes();
    leaf_hash(&[&key_len[..], key, value_hash.as_bytes()].concat())
}

/// Merkle tree root computation
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return Hash::ZERO;
    }
    
    if leaves.len() == 1 {
        return leaves[0];
    }
    
    let mut current_level: Vec<Hash> = leaves.to_vec();
    
    while current_level.len() > 1 {
        let mut next_level = Vec::with_capacity((current_level.len() + 1) / 2);
        
        for chunk in current_level.chunks(2) {
            let hash = if chunk.len() == 2 {
                inner_hash(&chunk[0], &chunk[1])
            } else {
                // Odd number: hash with itself
                inner_hash(&chunk[0], &chunk[0])
            };
            next_level.push(hash);
        }
        
        current_level = next_level;
    }
    
    current_level[0]
}
