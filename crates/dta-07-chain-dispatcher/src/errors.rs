//! Dispatcher errors.

use dta_01_local_store::LocalStoreError;
use dta_03_chain_client::ChainError;
use dta_06_order_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Chain still unreachable after the retry budget ran out.
    #[error("chain unavailable: {0}")]
    Chain(#[from] ChainError),

    /// The cursor or processed marker could not be read or written.
    #[error("dispatch ledger failure: {0}")]
    Store(#[from] LocalStoreError),

    /// A protocol step hit an error that makes local state untrustworthy.
    #[error("fatal protocol failure on {tx_hash}: {source}")]
    Fatal {
        tx_hash: String,
        #[source]
        source: ProtocolError,
    },

    /// A transaction kept failing with retryable errors; the cursor stays put.
    #[error("gave up on {tx_hash} after {attempts} attempts: {source}")]
    RetriesExhausted {
        tx_hash: String,
        attempts: u32,
        #[source]
        source: ProtocolError,
    },

    /// The live subscription ended while the node was still running.
    #[error("chain subscription closed")]
    SubscriptionClosed,
}
