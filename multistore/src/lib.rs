//! Canopy Multistore
//!
//! Aggregates independently versioned substores into one logical store with
//! a single commit identifier per version.
//!
//! Lifecycle: construct → mount every substore → load (latest or a specific
//! version) → any number of write/commit cycles. Loading again, e.g. to roll
//! back, takes a fresh instance over the same database.
//!
//! ```rust,no_run
//! use canopy_core::{KvStore, QueryRequest, StoreKey, StoreType};
//! use canopy_multistore::MultiStore;
//! use canopy_state::MemDatabase;
//!
//! # fn main() -> canopy_core::StoreResult<()> {
//! let db = MemDatabase::new();
//! let bank = StoreKey::new("bank");
//!
//! let mut store = MultiStore::new(db.shared());
//! store.mount_store(bank.clone(), StoreType::Tree)?;
//! store.load_latest_version()?;
//!
//! if let Some(bank_store) = store.get_kv_store(&bank) {
//!     bank_store.set(b"alice", b"100")?;
//! }
//! let commit_id = store.commit()?;
//!
//! let res = store.query(&QueryRequest::new("/bank/key", b"alice".to_vec()));
//! assert_eq!(res.value, Some(b"100".to_vec()));
//! # let _ = commit_id;
//! # Ok(())
//! # }
//! ```

pub mod registry;
pub mod path;
pub mod store;
pub mod loader;
pub mod commit;
pub mod query;

#[cfg(test)]
mod testing;

pub use registry::*;
pub use path::*;
pub use store::*;
pub use commit::*;
