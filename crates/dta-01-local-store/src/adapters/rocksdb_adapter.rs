//! # RocksDB Backend
//!
//! Durable backend for `<home>/datastore`.
//!
//! ## Configuration
//!
//! - Snappy compression
//! - Bloom filters (10 bits per key)
//! - fsync on write unless built with [`RocksDbConfig::for_testing`]

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rocksdb::{IteratorMode, Options, WriteBatch, DB};

use crate::errors::LocalStoreError;
use crate::ports::{BatchOperation, KeyValueBackend};

/// RocksDB configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 32MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./datastore".to_string(),
            block_cache_size: 32 * 1024 * 1024, // 32MB
            write_buffer_size: 16 * 1024 * 1024, // 16MB
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Config rooted at `path` with default tuning.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        }
    }

    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
            block_cache_size: 4 * 1024 * 1024,  // 4MB
            write_buffer_size: 1024 * 1024,     // 1MB
            sync_writes: false,
        }
    }
}

/// RocksDB-backed [`KeyValueBackend`].
pub struct RocksDbStore {
    db: Arc<RwLock<DB>>,
    config: RocksDbConfig,
}

fn io_error(op: &str, e: rocksdb::Error) -> LocalStoreError {
    LocalStoreError::IOError {
        message: format!("RocksDB {} failed: {}", op, e),
    }
}

impl RocksDbStore {
    /// Open or create the database.
    pub fn open(config: RocksDbConfig) -> Result<Self, LocalStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path).map_err(|e| io_error("open", e))?;
        tracing::debug!(path = %config.path, "local store opened");

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            config,
        })
    }

    fn write_options(&self) -> rocksdb::WriteOptions {
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }
}

impl KeyValueBackend for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LocalStoreError> {
        let db = self.db.read();
        db.get(key).map_err(|e| io_error("get", e))
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), LocalStoreError> {
        let db = self.db.write();
        let mut batch = WriteBatch::default();

        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    batch.put(&key, &value);
                }
                BatchOperation::Delete { key } => {
                    batch.delete(&key);
                }
            }
        }

        db.write_opt(batch, &self.write_options())
            .map_err(|e| io_error("batch write", e))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, LocalStoreError> {
        let db = self.db.read();
        let mut results = Vec::new();

        let iter = db.iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));
        for item in iter {
            let (key, value) = item.map_err(|e| io_error("scan", e))?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }

    fn flush(&self) -> Result<(), LocalStoreError> {
        self.db.read().flush().map_err(|e| io_error("flush", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap();
            store
                .atomic_batch_write(vec![BatchOperation::put(b"chain".to_vec(), b"7.1".to_vec())])
                .unwrap();
            store.flush().unwrap();
        }
        let store = RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap();
        assert_eq!(store.get(b"chain").unwrap(), Some(b"7.1".to_vec()));
    }

    #[test]
    fn test_prefix_scan_stops_at_prefix_end() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"order\0data\0b".to_vec(), b"2".to_vec()),
                BatchOperation::put(b"order\0data\0a".to_vec(), b"1".to_vec()),
                BatchOperation::put(b"orderState\0data\0a".to_vec(), b"x".to_vec()),
            ])
            .unwrap();

        let scanned = store.prefix_scan(b"order\0data\0").unwrap();
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].1, b"1".to_vec());
    }
}
