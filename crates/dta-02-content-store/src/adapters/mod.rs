//! Content store implementations.

pub mod fs;
pub mod ipfs_api;
pub mod memory;
