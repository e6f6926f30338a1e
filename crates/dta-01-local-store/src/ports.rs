//! # Backend Port
//!
//! Production: [`RocksDbStore`](crate::RocksDbStore).
//! Testing: [`InMemoryKVStore`](crate::InMemoryKVStore).

use crate::errors::LocalStoreError;

/// Ordered byte key-value backend.
///
/// Implementations lock internally; the [`LocalStore`](crate::LocalStore)
/// adds the writer lock that makes index maintenance atomic.
pub trait KeyValueBackend: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LocalStoreError>;

    /// Apply every operation or none of them.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), LocalStoreError>;

    /// All pairs whose key starts with `prefix`, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, LocalStoreError>;

    /// Flush buffered writes before shutdown.
    fn flush(&self) -> Result<(), LocalStoreError> {
        Ok(())
    }
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}
