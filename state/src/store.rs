//! Substore construction by store kind

use canopy_core::{
    CommitKvStore, Database, PruningOptions, SharedDatabase, StoreError, StoreResult, StoreType,
    Version,
};
use tracing::debug;

use crate::transient::TransientStore;
use crate::tree::TreeStore;

/// Latest version persisted for a store of `store_type` in `db`.
///
/// `None` for kinds that keep no history and can load any version.
pub fn latest_version(store_type: StoreType, db: &dyn Database) -> StoreResult<Option<Version>> {
    match store_type {
        StoreType::Tree => TreeStore::latest_version(db).map(Some),
        StoreType::Transient => Ok(None),
    }
}

/// Bind a substore of `store_type` at exactly `version`
pub fn load_store(
    store_type: StoreType,
    name: &str,
    db: SharedDatabase,
    version: Version,
    pruning: PruningOptions,
) -> StoreResult<Box<dyn CommitKvStore>> {
    if version < 0 {
        return Err(StoreError::InvalidVersion(version));
    }
    debug!("Loading {} store {} at v{}", store_type, name, version);

    let store: Box<dyn CommitKvStore> = match store_type {
        StoreType::Tree => Box::new(TreeStore::load(name, db, version, pruning)?),
        StoreType::Transient => Box::new(TransientStore::new(version)),
    };
    Ok(store)
}
