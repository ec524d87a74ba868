//! Canopy Cryptography Module
//! 
//! Hashing and Merkle primitives used to authenticate store state:
//! - BLAKE3 for hashing
//! - Binary Merkle trees over key/value leaves, with inclusion proofs
//! - Merkle hash of a name → bytes map, used for the multistore root

pub mod hashing;
pub mod merkle;

pub use hashing::*;
pub use merkle::*;
