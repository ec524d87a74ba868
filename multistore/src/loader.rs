//! Version loader: binds mounted keys to substores at one version

use canopy_core::{CommitId, StoreError, StoreResult, Version};
use canopy_state::{latest_version, load_store};
use tracing::{error, info};

use crate::commit::hash_store_infos;
use crate::store::{store_infos, MultiStore, StoreMap};

impl MultiStore {
    /// Load every mounted substore at its latest persisted version.
    ///
    /// Substores that keep history must agree on that version.
    pub fn load_latest_version(&mut self) -> StoreResult<()> {
        self.ensure_unloaded()?;
        let version = self.latest_persisted_version()?;
        self.load_version(version)
    }

    /// Load every mounted substore at exactly `version`.
    ///
    /// If any substore cannot produce `version`, nothing is bound and the
    /// multistore stays unloaded; a later call may try another version.
    pub fn load_version(&mut self, version: Version) -> StoreResult<()> {
        self.ensure_unloaded()?;
        if version < 0 {
            return Err(StoreError::InvalidVersion(version));
        }

        let mut stores = StoreMap::new();
        for (key, params) in self.registry.iter() {
            let db = params.database(&self.db, key.name());
            let store = load_store(params.store_type, key.name(), db, version, self.pruning)?;

            let loaded = store.last_commit_id().version;
            if loaded != version {
                error!(
                    "Store {} loaded at v{} instead of v{}",
                    key.name(),
                    loaded,
                    version
                );
                return Err(StoreError::VersionMismatch {
                    store: key.name().to_string(),
                    expected: version,
                    got: loaded,
                });
            }
            stores.insert(key.clone(), store);
        }

        // Version 0 has nothing committed and keeps the zero identifier.
        let last_commit_id = if version == 0 {
            CommitId::default()
        } else {
            CommitId::new(version, hash_store_infos(&store_infos(&stores))?)
        };

        info!(
            "Loaded multistore at {} ({} stores)",
            last_commit_id,
            stores.len()
        );
        self.stores = Some(stores);
        self.last_commit_id = last_commit_id;
        Ok(())
    }

    fn latest_persisted_version(&self) -> StoreResult<Version> {
        let mut latest: Option<(&str, Version)> = None;

        for (key, params) in self.registry.iter() {
            let db = params.database(&self.db, key.name());
            let Some(version) = latest_version(params.store_type, db.as_ref())? else {
                continue;
            };

            match latest {
                None => latest = Some((key.name(), version)),
                Some((first, expected)) if expected != version => {
                    error!(
                        "Stores disagree on latest version: {} at v{}, {} at v{}",
                        first,
                        expected,
                        key.name(),
                        version
                    );
                    return Err(StoreError::VersionMismatch {
                        store: key.name().to_string(),
                        expected,
                        got: version,
                    });
                }
                Some(_) => {}
            }
        }

        Ok(latest.map_or(0, |(_, version)| version))
    }
}
