//! # Content Store (dta-02)
//!
//! Content-addressed storage for identity documents: `put(bytes) -> cid` and
//! `get(cid) -> bytes`, where the CID is the base58 SHA-256 multihash
//! (`Qm…`, 46 characters) of the stored bytes.
//!
//! ## Implementations
//!
//! | Store | Backing | Use |
//! |-------|---------|-----|
//! | [`MemoryContentStore`] | `HashMap` | tests, single-process federations |
//! | [`FsContentStore`] | `<home>/ipfs-data/<cid>` | `ipfs.connector: embedded` |
//! | [`IpfsApiStore`] | IPFS HTTP API | `ipfs.connector: api` |
//!
//! The local stores check on read that the bytes hash to the requested CID, so
//! a corrupted file is rejected before decoding. The IPFS daemon assigns and
//! verifies its own CIDs.

pub mod adapters;
pub mod errors;
pub mod ports;

pub use adapters::fs::FsContentStore;
pub use adapters::ipfs_api::IpfsApiStore;
pub use adapters::memory::MemoryContentStore;
pub use errors::ContentStoreError;
pub use ports::{verify_content, ContentStore};
