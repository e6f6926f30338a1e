//! # Key Store
//!
//! Named secrets kept next to the node. The file store writes a JSON object of
//! hex strings (`{"seed": "<hex>"}`) with mode 0600.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::errors::IdentityError;

/// Name under which the node seed is stored.
pub const SEED_KEY: &str = "seed";

/// Named secret storage.
pub trait KeyStore: Send + Sync {
    fn set(&self, name: &str, key: &[u8]) -> Result<(), IdentityError>;

    /// [`IdentityError::KeyNotFound`] when `name` was never set.
    fn get(&self, name: &str) -> Result<Zeroizing<Vec<u8>>, IdentityError>;
}

/// In-memory [`KeyStore`] for tests.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: RwLock<BTreeMap<String, Zeroizing<Vec<u8>>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn set(&self, name: &str, key: &[u8]) -> Result<(), IdentityError> {
        self.keys
            .write()
            .insert(name.to_string(), Zeroizing::new(key.to_vec()));
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Zeroizing<Vec<u8>>, IdentityError> {
        self.keys
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| IdentityError::KeyNotFound(name.to_string()))
    }
}

/// [`KeyStore`] persisted to a JSON file.
pub struct FileKeyStore {
    path: PathBuf,
    keys: RwLock<BTreeMap<String, String>>,
}

impl FileKeyStore {
    /// Open the key file at `path`; a missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IdentityError> {
        let path = path.as_ref().to_path_buf();
        let keys = match std::fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            keys: RwLock::new(keys),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, keys: &BTreeMap<String, String>) -> Result<(), IdentityError> {
        let raw = Zeroizing::new(serde_json::to_vec_pretty(keys)?);
        std::fs::write(&self.path, &raw[..])?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }
        Ok(())
    }
}

impl KeyStore for FileKeyStore {
    fn set(&self, name: &str, key: &[u8]) -> Result<(), IdentityError> {
        let mut keys = self.keys.write();
        keys.insert(name.to_string(), hex::encode(key));
        self.persist(&keys)?;
        tracing::debug!(name, path = %self.path.display(), "stored key");
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Zeroizing<Vec<u8>>, IdentityError> {
        let keys = self.keys.read();
        let encoded = keys
            .get(name)
            .ok_or_else(|| IdentityError::KeyNotFound(name.to_string()))?;
        hex::decode(encoded)
            .map(Zeroizing::new)
            .map_err(|e| IdentityError::KeyStore {
                message: format!("key {} is not hex: {}", name, e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryKeyStore::new();
        assert!(matches!(store.get(SEED_KEY), Err(IdentityError::KeyNotFound(_))));
        store.set(SEED_KEY, &[1, 2, 3]).unwrap();
        assert_eq!(&store.get(SEED_KEY).unwrap()[..], &[1, 2, 3]);
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys");

        let store = FileKeyStore::open(&path).unwrap();
        assert!(store.get(SEED_KEY).is_err());
        store.set(SEED_KEY, &[0xab; 48]).unwrap();

        let reopened = FileKeyStore::open(&path).unwrap();
        assert_eq!(&reopened.get(SEED_KEY).unwrap()[..], &[0xab; 48][..]);

        let raw: BTreeMap<String, String> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw[SEED_KEY], "ab".repeat(48));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys");
        FileKeyStore::open(&path).unwrap().set(SEED_KEY, b"x").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(FileKeyStore::open(&path), Err(IdentityError::KeyStore { .. })));
    }
}
