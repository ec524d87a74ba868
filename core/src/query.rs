//! State-query envelope and Merkle proof types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Hash, Version};

/// Path-addressed state query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QueryRequest {
    /// Slash-delimited path, e.g. `/store1/key`
    pub path: String,
    /// Opaque payload interpreted by the target substore
    pub data: Vec<u8>,
    /// Committed version to read; `0` means latest
    pub height: Version,
    /// Ask for an inclusion proof
    pub prove: bool,
}

impl QueryRequest {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            height: 0,
            prove: false,
        }
    }

    pub fn at_height(mut self, height: Version) -> Self {
        self.height = height;
        self
    }

    pub fn with_proof(mut self) -> Self {
        self.prove = true;
        self
    }
}

/// Response codes carried by [`QueryResponse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ResponseCode {
    Ok = 0,
    Internal = 1,
    UnknownRequest = 6,
    InvalidHeight = 7,
}

impl ResponseCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn is_ok(self) -> bool {
        self == ResponseCode::Ok
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseCode::Ok => "ok",
            ResponseCode::Internal => "internal",
            ResponseCode::UnknownRequest => "unknown request",
            ResponseCode::InvalidHeight => "invalid height",
        };
        write!(f, "{} ({})", name, self.as_u32())
    }
}

/// Response to a [`QueryRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub code: ResponseCode,
    /// `None` for a successful lookup of an absent key
    pub value: Option<Vec<u8>>,
    pub proof: Option<MerkleProof>,
    pub height: Version,
    /// Human-readable detail for non-OK codes
    pub log: String,
}

impl QueryResponse {
    pub fn ok(value: Option<Vec<u8>>, height: Version) -> Self {
        Self {
            code: ResponseCode::Ok,
            value,
            proof: None,
            height,
            log: String::new(),
        }
    }

    pub fn error(code: ResponseCode, log: impl Into<String>) -> Self {
        Self {
            code,
            value: None,
            proof: None,
            height: 0,
            log: log.into(),
        }
    }

    pub fn unknown_request(log: impl Into<String>) -> Self {
        Self::error(ResponseCode::UnknownRequest, log)
    }

    pub fn with_proof(mut self, proof: Option<MerkleProof>) -> Self {
        self.proof = proof;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }
}

/// Side of a sibling in a Merkle proof path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofSide {
    Left,
    Right,
}

/// Inclusion proof of one key/value pair under a substore root.
///
/// Built and verified by `canopy-crypto`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// (sibling, side) pairs from leaf to root
    pub path: Vec<(Hash, ProofSide)>,
    pub root: Hash,
}
