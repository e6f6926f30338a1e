//! # In-Memory Chain
//!
//! One transaction per block, heights starting at 1. Live subscribers are fed
//! from a broadcast channel; a lagging subscriber skips what it missed and is
//! expected to catch up through [`ChainClient::search_by_recipient`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{BlockChainTX, TAG_RECIPIENT};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::errors::ChainError;
use crate::ports::{ChainClient, SearchPage, TxStream};

const BROADCAST_CAPACITY: usize = 1024;

#[derive(Default)]
struct ChainLog {
    txs: Vec<BlockChainTX>,
    by_hash: HashMap<String, usize>,
}

/// In-process [`ChainClient`]. Clones share the same log.
#[derive(Clone)]
pub struct MemoryChain {
    log: Arc<RwLock<ChainLog>>,
    live: broadcast::Sender<BlockChainTX>,
    failing_posts: Arc<AtomicUsize>,
}

impl Default for MemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChain {
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            log: Arc::new(RwLock::new(ChainLog::default())),
            live,
            failing_posts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of committed transactions.
    pub fn len(&self) -> usize {
        self.log.read().txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every committed transaction, in chain order.
    pub fn transactions(&self) -> Vec<BlockChainTX> {
        self.log.read().txs.clone()
    }

    /// Make the next `count` calls to `post_tx` fail with a transport error.
    pub fn fail_next_posts(&self, count: usize) {
        self.failing_posts.store(count, Ordering::SeqCst);
    }

    /// Deliver an already committed transaction to live subscribers again.
    pub fn redeliver(&self, tx_hash: &str) -> Result<(), ChainError> {
        let tx = self.lookup(tx_hash)?;
        let _ = self.live.send(tx);
        Ok(())
    }

    fn lookup(&self, tx_hash: &str) -> Result<BlockChainTX, ChainError> {
        let log = self.log.read();
        log.by_hash
            .get(tx_hash)
            .and_then(|&i| log.txs.get(i))
            .cloned()
            .ok_or_else(|| ChainError::NotFound(tx_hash.to_string()))
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_posts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn addressed_to(tx: &BlockChainTX, recipient: &str) -> bool {
    tx.tags.get(TAG_RECIPIENT).map(String::as_str) == Some(recipient)
}

#[async_trait]
impl ChainClient for MemoryChain {
    async fn post_tx(&self, tx: &BlockChainTX) -> Result<String, ChainError> {
        if self.take_injected_failure() {
            return Err(ChainError::transport("injected post failure"));
        }
        if !tx.hash_matches_payload() {
            return Err(ChainError::Rejected {
                code: 1,
                log: "tx_hash does not match payload".to_string(),
            });
        }

        let committed = {
            let mut log = self.log.write();
            if log.by_hash.contains_key(&tx.tx_hash) {
                return Err(ChainError::Rejected {
                    code: 1,
                    log: "tx already exists".to_string(),
                });
            }
            let mut committed = tx.clone();
            committed.height = log.txs.len() as u64 + 1;
            committed.index = 0;
            let position = log.txs.len();
            log.by_hash.insert(committed.tx_hash.clone(), position);
            log.txs.push(committed.clone());
            committed
        };

        tracing::debug!(
            tx_hash = %committed.tx_hash,
            height = committed.height,
            processor = committed.processor.as_str(),
            "committed transaction"
        );
        let _ = self.live.send(committed.clone());
        Ok(committed.tx_hash)
    }

    async fn get_tx(&self, tx_hash: &str) -> Result<BlockChainTX, ChainError> {
        self.lookup(tx_hash)
    }

    async fn subscribe(&self, recipient: &str) -> Result<TxStream, ChainError> {
        let recipient = recipient.to_string();
        let stream = BroadcastStream::new(self.live.subscribe()).filter_map(move |item| match item {
            Ok(tx) if addressed_to(&tx, &recipient) => Some(tx),
            Ok(_) => None,
            Err(lagged) => {
                tracing::warn!(error = %lagged, "subscriber lagged behind chain");
                None
            }
        });
        Ok(Box::pin(stream))
    }

    async fn search_by_recipient(
        &self,
        recipient: &str,
        min_height: u64,
        max_height: u64,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, ChainError> {
        let log = self.log.read();
        let matches: Vec<&BlockChainTX> = log
            .txs
            .iter()
            .filter(|tx| tx.height >= min_height && tx.height <= max_height)
            .filter(|tx| addressed_to(tx, recipient))
            .collect();

        let per_page = per_page.max(1) as usize;
        let skip = (page.max(1) as usize - 1) * per_page;
        Ok(SearchPage {
            total_count: matches.len() as u64,
            txs: matches.into_iter().skip(skip).take(per_page).cloned().collect(),
        })
    }

    async fn latest_height(&self) -> Result<u64, ChainError> {
        Ok(self.log.read().txs.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Processor;
    use std::time::Duration;

    fn tx(to: &str, body: &str) -> BlockChainTX {
        BlockChainTX::new(Processor::None, "sender", to, "ref", body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_post_assigns_heights_and_get_finds_it() {
        let chain = MemoryChain::new();
        let a = chain.post_tx(&tx("alice", "one")).await.unwrap();
        let b = chain.post_tx(&tx("bob", "two")).await.unwrap();

        assert_eq!(chain.get_tx(&a).await.unwrap().height, 1);
        assert_eq!(chain.get_tx(&b).await.unwrap().height, 2);
        assert_eq!(chain.latest_height().await.unwrap(), 2);
        assert!(matches!(chain.get_tx("00").await, Err(ChainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_and_tampered_rejected() {
        let chain = MemoryChain::new();
        let t = tx("alice", "one");
        chain.post_tx(&t).await.unwrap();
        assert!(matches!(chain.post_tx(&t).await, Err(ChainError::Rejected { .. })));

        let mut tampered = tx("alice", "two");
        tampered.payload = b"other".to_vec();
        assert!(matches!(chain.post_tx(&tampered).await, Err(ChainError::Rejected { .. })));
        assert_eq!(chain.len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_filters_by_recipient() {
        let chain = MemoryChain::new();
        let mut stream = chain.subscribe("alice").await.unwrap();

        chain.post_tx(&tx("bob", "skip")).await.unwrap();
        let wanted = chain.post_tx(&tx("alice", "keep")).await.unwrap();

        let got = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.tx_hash, wanted);
        assert_eq!(got.height, 2);
    }

    #[tokio::test]
    async fn test_redeliver_replays_to_subscribers() {
        let chain = MemoryChain::new();
        let hash = chain.post_tx(&tx("alice", "again")).await.unwrap();
        let mut stream = chain.subscribe("alice").await.unwrap();

        chain.redeliver(&hash).unwrap();
        let got = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.tx_hash, hash);
    }

    #[tokio::test]
    async fn test_search_pages_within_height_range() {
        let chain = MemoryChain::new();
        for i in 0..12 {
            chain.post_tx(&tx("alice", &format!("a{}", i))).await.unwrap();
            chain.post_tx(&tx("bob", &format!("b{}", i))).await.unwrap();
        }

        let first = chain.search_by_recipient("alice", 1, 24, 1, 5).await.unwrap();
        assert_eq!(first.total_count, 12);
        assert_eq!(first.txs.len(), 5);
        assert!(first.txs.windows(2).all(|w| w[0].height < w[1].height));

        let last = chain.search_by_recipient("alice", 1, 24, 3, 5).await.unwrap();
        assert_eq!(last.txs.len(), 2);

        let bounded = chain.search_by_recipient("alice", 10, 14, 1, 5).await.unwrap();
        assert_eq!(bounded.total_count, 2);
        assert!(bounded.txs.iter().all(|t| (10..=14).contains(&t.height)));
    }

    #[tokio::test]
    async fn test_injected_failures_are_transport_errors() {
        let chain = MemoryChain::new();
        chain.fail_next_posts(2);
        assert!(chain.post_tx(&tx("a", "1")).await.unwrap_err().is_transport());
        assert!(chain.post_tx(&tx("a", "1")).await.unwrap_err().is_transport());
        assert!(chain.post_tx(&tx("a", "1")).await.is_ok());
    }
}
