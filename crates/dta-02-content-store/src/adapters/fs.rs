//! # Embedded Content Store
//!
//! One file per document under `<home>/ipfs-data`, named by CID. Writes go
//! to a temporary name first and are renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shared_crypto::multihash_cid;

use crate::errors::ContentStoreError;
use crate::ports::{check_cid, verify_content, ContentStore};

/// Filesystem-backed content store.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Open (creating if needed) the store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, ContentStoreError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!(path = %root.display(), "embedded content store opened");
        Ok(Self { root })
    }

    fn path_for(&self, cid: &str) -> PathBuf {
        self.root.join(cid)
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, data: Vec<u8>) -> Result<String, ContentStoreError> {
        let cid = multihash_cid(&data);
        let path = self.path_for(&cid);
        if tokio::fs::try_exists(&path).await? {
            return Ok(cid);
        }

        let tmp = self.root.join(format!(".{}.tmp", cid));
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> Result<Vec<u8>, ContentStoreError> {
        check_cid(cid)?;
        let data = match tokio::fs::read(self.path_for(cid)).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ContentStoreError::NotFound(cid.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        verify_content(cid, &data)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let cid = {
            let store = FsContentStore::open(dir.path()).await.unwrap();
            store.put(b"persisted".to_vec()).await.unwrap()
        };
        let store = FsContentStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get(&cid).await.unwrap(), b"persisted");
    }

    #[tokio::test]
    async fn test_corrupted_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(dir.path()).await.unwrap();
        let cid = store.put(b"original".to_vec()).await.unwrap();
        std::fs::write(dir.path().join(&cid), b"tampered").unwrap();
        assert!(matches!(
            store.get(&cid).await,
            Err(ContentStoreError::InvalidDocument { .. })
        ));
    }

    #[tokio::test]
    async fn test_path_like_cid_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.get("../../etc/passwd").await,
            Err(ContentStoreError::InvalidCid(_))
        ));
        let missing = multihash_cid(b"missing");
        assert!(matches!(store.get(&missing).await, Err(ContentStoreError::NotFound(_))));
    }
}
