//! Backend implementations.

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;
