//! Chain client implementations.

pub mod memory;
pub mod tendermint;
