//! # Content Store Port

use async_trait::async_trait;
use shared_crypto::multihash_cid;
use shared_types::is_cid;

use crate::errors::ContentStoreError;

/// Content-addressed document storage.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Identifier of the backing node; empty for local stores.
    fn id(&self) -> String {
        String::new()
    }

    /// Store `data` and return its CID.
    async fn put(&self, data: Vec<u8>) -> Result<String, ContentStoreError>;

    /// Fetch the bytes stored under `cid`.
    async fn get(&self, cid: &str) -> Result<Vec<u8>, ContentStoreError>;
}

/// Reject syntactically invalid CIDs before touching a backend.
pub(crate) fn check_cid(cid: &str) -> Result<(), ContentStoreError> {
    if is_cid(cid) {
        Ok(())
    } else {
        Err(ContentStoreError::InvalidCid(cid.to_string()))
    }
}

/// Check that `data` hashes to `cid`.
pub fn verify_content(cid: &str, data: &[u8]) -> Result<(), ContentStoreError> {
    if multihash_cid(data) == cid {
        Ok(())
    } else {
        Err(ContentStoreError::InvalidDocument {
            cid: cid.to_string(),
        })
    }
}
