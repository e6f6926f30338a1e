//! In-memory content store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_crypto::multihash_cid;

use crate::errors::ContentStoreError;
use crate::ports::{check_cid, ContentStore};

/// `HashMap` keyed by CID.
#[derive(Default)]
pub struct MemoryContentStore {
    docs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, data: Vec<u8>) -> Result<String, ContentStoreError> {
        let cid = multihash_cid(&data);
        self.docs.write().insert(cid.clone(), data);
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> Result<Vec<u8>, ContentStoreError> {
        check_cid(cid)?;
        self.docs
            .read()
            .get(cid)
            .cloned()
            .ok_or_else(|| ContentStoreError::NotFound(cid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = MemoryContentStore::new();
        let cid = store.put(b"iddoc".to_vec()).await.unwrap();
        assert_eq!(cid.len(), 46);
        assert_eq!(store.get(&cid).await.unwrap(), b"iddoc");
    }

    #[tokio::test]
    async fn test_same_bytes_same_cid() {
        let store = MemoryContentStore::new();
        let a = store.put(b"x".to_vec()).await.unwrap();
        let b = store.put(b"x".to_vec()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_and_invalid() {
        let store = MemoryContentStore::new();
        let cid = multihash_cid(b"never stored");
        assert!(matches!(store.get(&cid).await, Err(ContentStoreError::NotFound(_))));
        assert!(matches!(store.get("nope").await, Err(ContentStoreError::InvalidCid(_))));
    }
}
