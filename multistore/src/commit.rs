//! Commit coordination and the multistore root hash

use canopy_core::{CommitId, StoreError, StoreInfo, StoreResult, Version};
use canopy_crypto::simple_hash_from_map;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error, info};

use crate::store::{store_infos, MultiStore, StoreMap};

/// Root hash over per-substore commit identifiers.
///
/// Each substore contributes one leaf keyed by its name, so the result does
/// not depend on the order of `infos`.
pub fn hash_store_infos<'a>(
    infos: impl IntoIterator<Item = &'a StoreInfo>,
) -> StoreResult<Vec<u8>> {
    let map = infos
        .into_iter()
        .map(|info| Ok((info.name.clone(), info.to_bytes()?)))
        .collect::<StoreResult<BTreeMap<String, Vec<u8>>>>()?;
    Ok(simple_hash_from_map(&map).to_vec())
}

/// Everything that went into one multistore version's root hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub version: Version,
    pub store_infos: Vec<StoreInfo>,
}

impl CommitInfo {
    pub fn hash(&self) -> StoreResult<Vec<u8>> {
        hash_store_infos(&self.store_infos)
    }

    pub fn commit_id(&self) -> StoreResult<CommitId> {
        Ok(CommitId::new(self.version, self.hash()?))
    }
}

impl MultiStore {
    /// Commit every substore and advance to the next version.
    ///
    /// Substores commit in name order and each must land on the version
    /// after the current one. Any failure leaves substores on mixed
    /// versions, so it also marks the instance failed: later commits,
    /// `commit_info` and queries are refused.
    pub fn commit(&mut self) -> StoreResult<CommitId> {
        let stores = self.usable_stores()?;
        let version = self.last_commit_id.version + 1;

        match commit_stores(stores, version) {
            Ok(commit_id) => {
                info!("Committed multistore {}", commit_id);
                self.last_commit_id = commit_id.clone();
                Ok(commit_id)
            }
            Err(e) => {
                error!(
                    "Commit of v{} failed, multistore stops serving: {}",
                    version, e
                );
                self.failure = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Per-substore identifiers behind the current root hash
    pub fn commit_info(&self) -> StoreResult<CommitInfo> {
        let stores = self.usable_stores()?;
        Ok(CommitInfo {
            version: self.last_commit_id.version,
            store_infos: store_infos(stores),
        })
    }
}

fn commit_stores(stores: &StoreMap, version: Version) -> StoreResult<CommitId> {
    for (key, store) in stores.iter() {
        let id = store.commit()?;
        if id.version != version {
            error!(
                "Store {} committed v{}, expected v{}",
                key.name(),
                id.version,
                version
            );
            return Err(StoreError::VersionMismatch {
                store: key.name().to_string(),
                expected: version,
                got: id.version,
            });
        }
        debug!("Committed store {} at {}", key.name(), id);
    }

    Ok(CommitId::new(version, hash_store_infos(&store_infos(stores))?))
}
