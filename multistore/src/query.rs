//! Query routing by path prefix

use canopy_core::{QueryRequest, QueryResponse, ResponseCode};
use tracing::{debug, warn};

use crate::path::parse_path;
use crate::store::MultiStore;

impl MultiStore {
    /// Route `req` to the substore named by its first path segment.
    ///
    /// The rest of the path, the payload, height and proof flag are passed
    /// through and the substore's response is returned as is. Malformed
    /// paths and unmounted names are answered with `UnknownRequest`.
    pub fn query(&self, req: &QueryRequest) -> QueryResponse {
        let (store_name, subpath) = match parse_path(&req.path) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("Rejected query: {}", e);
                return QueryResponse::unknown_request(e.to_string());
            }
        };

        let Some(key) = self.registry.lookup(store_name) else {
            warn!("Query for unmounted store {:?}", store_name);
            return QueryResponse::unknown_request(format!("no such store: {}", store_name));
        };

        let store = match self.usable_stores() {
            Ok(stores) => match stores.get(key) {
                Some(store) => store,
                None => {
                    return QueryResponse::error(
                        ResponseCode::Internal,
                        format!("store {} mounted but not loaded", store_name),
                    )
                }
            },
            Err(e) => {
                warn!("Query for {} refused: {}", store_name, e);
                return QueryResponse::error(ResponseCode::Internal, e.to_string());
            }
        };

        debug!(
            "Routing query {} to store {} at height {}",
            subpath, store_name, req.height
        );
        let sub_req = QueryRequest {
            path: subpath.to_string(),
            data: req.data.clone(),
            height: req.height,
            prove: req.prove,
        };
        store.query(&sub_req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::new_multistore_with_mounts;
    use canopy_core::{StoreKey, StoreType};
    use canopy_crypto::verify_proof_against;
    use canopy_state::{MemDatabase, SledDatabase};
    use tempfile::TempDir;

    #[test]
    fn test_multistore_query() {
        let db = MemDatabase::new();
        let mut multi = new_multistore_with_mounts(&db);
        multi.load_latest_version().unwrap();

        let (k, v) = (b"wind".to_vec(), b"blows".to_vec());
        let (k2, v2) = (b"water".to_vec(), b"flows".to_vec());

        // Make sure we can get by name
        let store1 = multi.get_store_by_name("store1").unwrap();
        store1.set(&k, &v).unwrap();
        let store2 = multi.get_store_by_name("store2").unwrap();
        store2.set(&k2, &v2).unwrap();

        // Commit the multistore
        let cid = multi.commit().unwrap();
        let ver = cid.version;

        // Test bad path
        let query = QueryRequest::new("/key", k.clone()).at_height(ver);
        let res = multi.query(&query);
        assert_eq!(res.code, ResponseCode::UnknownRequest);

        let query = QueryRequest::new("/store1/", k.clone()).at_height(ver);
        let res = multi.query(&query);
        assert_eq!(res.code, ResponseCode::UnknownRequest);

        let query = QueryRequest::new("garbage/key", k.clone()).at_height(ver);
        let res = multi.query(&query);
        assert_eq!(res.code, ResponseCode::UnknownRequest);
        assert_eq!(res.value, None);

        // Invalid store name
        let query = QueryRequest::new("/garbage/key", k.clone()).at_height(ver);
        let res = multi.query(&query);
        assert_eq!(res.code, ResponseCode::UnknownRequest);

        // Valid query with data
        let query = QueryRequest::new("/store1/key", k.clone()).at_height(ver);
        let res = multi.query(&query);
        assert_eq!(res.code, ResponseCode::Ok);
        assert_eq!(res.value, Some(v.clone()));
        assert_eq!(res.height, ver);

        // Store2 data, absent key with a proof request
        let query = QueryRequest::new("/store2/key", k.clone())
            .at_height(ver)
            .with_proof();
        let res = multi.query(&query);
        assert_eq!(res.code, ResponseCode::Ok);
        assert_eq!(res.value, None);
        assert!(res.proof.is_none());

        // Store2 data, present key with a proof request
        let query = QueryRequest::new("/store2/key", k2.clone())
            .at_height(ver)
            .with_proof();
        let res = multi.query(&query);
        assert_eq!(res.code, ResponseCode::Ok);
        assert_eq!(res.value, Some(v2.clone()));

        let info = multi.commit_info().unwrap();
        let store2_info = info.store_infos.iter().find(|i| i.name == "store2").unwrap();
        let proof = res.proof.unwrap();
        assert!(verify_proof_against(&proof, &store2_info.commit_id.hash));
    }

    #[test]
    fn test_query_height_passes_through() {
        let db = MemDatabase::new();
        let mut multi = new_multistore_with_mounts(&db);
        multi.load_latest_version().unwrap();

        let store1 = multi.get_store_by_name("store1").unwrap();
        store1.set(b"k", b"old").unwrap();
        multi.commit().unwrap();
        multi.get_store_by_name("store1").unwrap().set(b"k", b"new").unwrap();
        multi.commit().unwrap();

        let res = multi.query(&QueryRequest::new("/store1/key", b"k".to_vec()).at_height(1));
        assert_eq!(res.value, Some(b"old".to_vec()));
        assert_eq!(res.height, 1);

        let res = multi.query(&QueryRequest::new("/store1/key", b"k".to_vec()));
        assert_eq!(res.value, Some(b"new".to_vec()));
        assert_eq!(res.height, 2);

        // Substore errors are relayed unchanged
        let res = multi.query(&QueryRequest::new("/store1/key", b"k".to_vec()).at_height(9));
        assert_eq!(res.code, ResponseCode::InvalidHeight);

        let res = multi.query(&QueryRequest::new("/store1/unknown", b"k".to_vec()));
        assert_eq!(res.code, ResponseCode::UnknownRequest);
    }

    #[test]
    fn test_query_before_load() {
        let db = MemDatabase::new();
        let multi = new_multistore_with_mounts(&db);

        let res = multi.query(&QueryRequest::new("/store1/key", b"k".to_vec()));
        assert_eq!(res.code, ResponseCode::Internal);
        assert_eq!(res.value, None);

        // Routing failures still win over the load state
        let res = multi.query(&QueryRequest::new("/nope/key", b"k".to_vec()));
        assert_eq!(res.code, ResponseCode::UnknownRequest);
    }

    #[test]
    fn test_query_transient_store() {
        let db = MemDatabase::new();
        let mut multi = MultiStore::new(db.shared());
        multi
            .mount_store(StoreKey::new("scratch"), StoreType::Transient)
            .unwrap();
        multi.load_latest_version().unwrap();

        let res = multi.query(&QueryRequest::new("/scratch/key", b"k".to_vec()));
        assert_eq!(res.code, ResponseCode::UnknownRequest);
    }

    #[test]
    fn test_sled_round_trip() {
        let tmp = TempDir::new().unwrap();

        {
            let db = SledDatabase::open(tmp.path()).unwrap();
            let accounts = db.tree("accounts").unwrap();
            let mut multi = MultiStore::new(db.shared());
            multi.mount_store(StoreKey::new("bank"), StoreType::Tree).unwrap();
            multi
                .mount_store_with_db(
                    StoreKey::new("accounts"),
                    StoreType::Tree,
                    Some(accounts.shared()),
                )
                .unwrap();
            multi.load_latest_version().unwrap();

            multi.get_store_by_name("bank").unwrap().set(b"alice", b"100").unwrap();
            multi.get_store_by_name("accounts").unwrap().set(b"bob", b"7").unwrap();
            multi.commit().unwrap();
        }

        let db = SledDatabase::open(tmp.path()).unwrap();
        let accounts = db.tree("accounts").unwrap();
        let mut multi = MultiStore::new(db.shared());
        multi.mount_store(StoreKey::new("bank"), StoreType::Tree).unwrap();
        multi
            .mount_store_with_db(StoreKey::new("accounts"), StoreType::Tree, Some(accounts.shared()))
            .unwrap();
        multi.load_latest_version().unwrap();
        assert_eq!(multi.last_commit_id().version, 1);

        let res = multi.query(&QueryRequest::new("/bank/key", b"alice".to_vec()));
        assert_eq!(res.code, ResponseCode::Ok);
        assert_eq!(res.value, Some(b"100".to_vec()));

        let res = multi.query(&QueryRequest::new("/accounts/key", b"bob".to_vec()));
        assert_eq!(res.value, Some(b"7".to_vec()));
    }
}
