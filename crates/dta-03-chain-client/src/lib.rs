//! # Chain Client (dta-03)
//!
//! Access to the append-only, tagged transaction log the order protocol runs
//! over. The chain orders transactions and assigns `(height, index)`; this
//! crate only posts, fetches, searches and subscribes.
//!
//! ## Implementations
//!
//! - [`TendermintClient`]: JSON-RPC over HTTP (`broadcast_tx_commit`,
//!   `tx_search`, `status`) and a websocket `subscribe` for live delivery.
//! - [`MemoryChain`]: an in-process log with the same tag semantics, one
//!   transaction per block, used by tests and single-process federations.
//!
//! ## Transaction Identity
//!
//! The txid of a [`BlockChainTX`](shared_types::BlockChainTX) is its
//! `tx_hash`, the hex SHA-256 of the payload. `get_tx` looks it up through the
//! `txhash` tag.

pub mod adapters;
pub mod errors;
pub mod ports;

pub use adapters::memory::MemoryChain;
pub use adapters::tendermint::TendermintClient;
pub use errors::ChainError;
pub use ports::{ChainClient, SearchPage, TxStream};
