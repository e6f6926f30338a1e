//! # Local Store (dta-01)
//!
//! Indexed key-value persistence for the node's per-order state: order seeds,
//! the order reference to chain txid mapping, the processed-height cursor and
//! the protocol's bookkeeping records.
//!
//! ## Layout
//!
//! Every record belongs to a *datatype*. Inside a datatype the store keeps
//! three key families in one flat keyspace:
//!
//! | Family | Key | Value |
//! |--------|-----|-------|
//! | data | `<datatype>\0data\0<key>` | record bytes |
//! | index | `<datatype>\0index-<name>\0<value>\0<time><rand>` | record key |
//! | index list | `<datatype>\0indexes\0<key>` | JSON map of the index keys written for `<key>` |
//!
//! Index keys sort by the caller's index value first, then by write time and a
//! random suffix, so equal index values never collide and
//! [`LocalStore::list_keys`] returns records in index order.
//!
//! ## Concurrency
//!
//! One writer lock serializes `set`/`del` (they read the old index list before
//! rewriting it); reads go straight to the backend.
//!
//! ## Crate Structure
//!
//! - `errors` - [`LocalStoreError`]
//! - `ports` - [`KeyValueBackend`] and [`BatchOperation`]
//! - `adapters/` - RocksDB and in-memory backends
//! - `store` - [`LocalStore`], the indexed API on top of a backend

pub mod adapters;
pub mod errors;
pub mod ports;
pub mod store;

pub use adapters::memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use adapters::rocksdb_adapter::{RocksDbConfig, RocksDbStore};
pub use errors::LocalStoreError;
pub use ports::{BatchOperation, KeyValueBackend};
pub use store::{IndexMap, LocalStore};
