//! # Chain Port

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use shared_types::BlockChainTX;

use crate::errors::ChainError;

/// Live transactions addressed to one recipient, in chain order.
///
/// The stream ends when the underlying subscription drops.
pub type TxStream = Pin<Box<dyn Stream<Item = BlockChainTX> + Send>>;

/// One page of a search.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Matching transactions, ascending by `(height, index)`.
    pub txs: Vec<BlockChainTX>,
    /// Total matches across all pages.
    pub total_count: u64,
}

/// Client for the ordered transaction log.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Post `tx` and wait for it to commit. Returns the txid.
    async fn post_tx(&self, tx: &BlockChainTX) -> Result<String, ChainError>;

    /// Fetch a committed transaction by txid.
    async fn get_tx(&self, tx_hash: &str) -> Result<BlockChainTX, ChainError>;

    /// Subscribe to transactions whose `recipient` tag equals `recipient`.
    async fn subscribe(&self, recipient: &str) -> Result<TxStream, ChainError>;

    /// Transactions for `recipient` with `min_height <= height <= max_height`.
    ///
    /// `page` starts at 1.
    async fn search_by_recipient(
        &self,
        recipient: &str,
        min_height: u64,
        max_height: u64,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, ChainError>;

    /// Height of the latest committed block.
    async fn latest_height(&self) -> Result<u64, ChainError>;
}
