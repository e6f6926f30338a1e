//! # Indexed Store
//!
//! [`LocalStore`] maps `(datatype, key)` to bytes and maintains secondary
//! indexes so records can be listed in index order.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::adapters::memory::InMemoryKVStore;
use crate::errors::LocalStoreError;
use crate::ports::{BatchOperation, KeyValueBackend};

/// Index name to index value.
pub type IndexMap = BTreeMap<String, String>;

const SEP: u8 = 0;

fn family_key(datatype: &str, family: &str, key: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(datatype.len() + family.len() + key.len() + 2);
    out.extend_from_slice(datatype.as_bytes());
    out.push(SEP);
    out.extend_from_slice(family.as_bytes());
    out.push(SEP);
    out.extend_from_slice(key.as_bytes());
    out
}

fn data_key(datatype: &str, key: &str) -> Vec<u8> {
    family_key(datatype, "data", key)
}

fn indexes_key(datatype: &str, key: &str) -> Vec<u8> {
    family_key(datatype, "indexes", key)
}

fn index_entry_key(datatype: &str, index: &str, value_key: &str) -> Vec<u8> {
    family_key(datatype, &format!("index-{}", index), value_key)
}

/// Sortable, unique key for one index value: `<value>\0<RFC3339 now><16 hex>`.
fn index_value_key(value: &str) -> String {
    let mut suffix = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut suffix);
    format!(
        "{}\0{}{}",
        value,
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        hex::encode(suffix)
    )
}

/// Indexed key-value store over a [`KeyValueBackend`].
///
/// Cloning shares the backend and the writer lock.
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn KeyValueBackend>,
    write_lock: Arc<Mutex<()>>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store backed by [`InMemoryKVStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKVStore::new()))
    }

    /// Store backed by RocksDB at `path`.
    #[cfg(feature = "rocksdb")]
    pub fn open_rocksdb(path: impl AsRef<std::path::Path>) -> Result<Self, LocalStoreError> {
        let config = crate::RocksDbConfig::at(path);
        Ok(Self::new(Arc::new(crate::RocksDbStore::open(config)?)))
    }

    fn stored_indexes(&self, datatype: &str, key: &str) -> Result<IndexMap, LocalStoreError> {
        match self.backend.get(&indexes_key(datatype, key))? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(IndexMap::new()),
        }
    }

    fn drop_index_ops(&self, datatype: &str, key: &str) -> Result<Vec<BatchOperation>, LocalStoreError> {
        let mut ops: Vec<BatchOperation> = self
            .stored_indexes(datatype, key)?
            .iter()
            .map(|(name, value_key)| BatchOperation::delete(index_entry_key(datatype, name, value_key)))
            .collect();
        ops.push(BatchOperation::delete(indexes_key(datatype, key)));
        Ok(ops)
    }

    /// Store `value` under `key`, replacing any previous value and its indexes.
    pub fn set(
        &self,
        datatype: &str,
        key: &str,
        value: &[u8],
        index: &IndexMap,
    ) -> Result<(), LocalStoreError> {
        let _guard = self.write_lock.lock();

        let mut ops = self.drop_index_ops(datatype, key)?;
        ops.push(BatchOperation::put(data_key(datatype, key), value.to_vec()));

        if !index.is_empty() {
            let mut written = IndexMap::new();
            for (name, value) in index {
                let value_key = index_value_key(value);
                ops.push(BatchOperation::put(
                    index_entry_key(datatype, name, &value_key),
                    key.as_bytes().to_vec(),
                ));
                written.insert(name.clone(), value_key);
            }
            ops.push(BatchOperation::put(
                indexes_key(datatype, key),
                serde_json::to_vec(&written)?,
            ));
        }

        self.backend.atomic_batch_write(ops)
    }

    /// Value stored under `key`, or [`LocalStoreError::KeyNotFound`].
    pub fn get(&self, datatype: &str, key: &str) -> Result<Vec<u8>, LocalStoreError> {
        self.backend
            .get(&data_key(datatype, key))?
            .ok_or_else(|| LocalStoreError::KeyNotFound {
                datatype: datatype.to_string(),
                key: key.to_string(),
            })
    }

    /// Delete `key` and its indexes. Deleting a missing key is not an error.
    pub fn del(&self, datatype: &str, key: &str) -> Result<(), LocalStoreError> {
        let _guard = self.write_lock.lock();

        let mut ops = self.drop_index_ops(datatype, key)?;
        ops.push(BatchOperation::delete(data_key(datatype, key)));
        self.backend.atomic_batch_write(ops)
    }

    /// Keys of `datatype` ordered by `index`.
    ///
    /// Skips the first `skip` entries, then returns at most `limit` keys
    /// (`0` means unlimited). `reverse` walks from the highest index value.
    pub fn list_keys(
        &self,
        datatype: &str,
        index: &str,
        skip: usize,
        limit: usize,
        reverse: bool,
    ) -> Result<Vec<String>, LocalStoreError> {
        let prefix = index_entry_key(datatype, index, "");
        let mut keys: Vec<String> = self
            .backend
            .prefix_scan(&prefix)?
            .into_iter()
            .map(|(_, v)| String::from_utf8_lossy(&v).into_owned())
            .collect();
        if reverse {
            keys.reverse();
        }

        let take = if limit == 0 { usize::MAX } else { limit };
        Ok(keys.into_iter().skip(skip).take(take).collect())
    }

    /// Store a UTF-8 string.
    pub fn set_string(
        &self,
        datatype: &str,
        key: &str,
        value: &str,
        index: &IndexMap,
    ) -> Result<(), LocalStoreError> {
        self.set(datatype, key, value.as_bytes(), index)
    }

    /// Read a UTF-8 string.
    pub fn get_string(&self, datatype: &str, key: &str) -> Result<String, LocalStoreError> {
        String::from_utf8(self.get(datatype, key)?).map_err(|e| LocalStoreError::Codec {
            message: e.to_string(),
        })
    }

    /// Store a JSON-encoded value.
    pub fn set_json<T: Serialize>(
        &self,
        datatype: &str,
        key: &str,
        value: &T,
        index: &IndexMap,
    ) -> Result<(), LocalStoreError> {
        self.set(datatype, key, &serde_json::to_vec(value)?, index)
    }

    /// Read a JSON-encoded value.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        datatype: &str,
        key: &str,
    ) -> Result<T, LocalStoreError> {
        Ok(serde_json::from_slice(&self.get(datatype, key)?)?)
    }

    /// Flush the backend.
    pub fn close(&self) -> Result<(), LocalStoreError> {
        let _guard = self.write_lock.lock();
        self.backend.flush()
    }
}
