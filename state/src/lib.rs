//! Canopy State Management
//! 
//! Byte-oriented databases and the substore kinds the multistore mounts.
//! - `memory` / `persistent`: in-memory and sled-backed [`Database`]s
//! - `prefix`: per-store namespacing inside a shared database
//! - `tree`: persistent, versioned Merkle key-value store
//! - `transient`: per-block scratch store
//!
//! [`Database`]: canopy_core::Database

pub mod store;
pub mod memory;
pub mod persistent;
pub mod prefix;
pub mod tree;
pub mod transient;

pub use store::*;
pub use memory::*;
pub use persistent::*;
pub use prefix::*;
pub use tree::*;
pub use transient::*;
