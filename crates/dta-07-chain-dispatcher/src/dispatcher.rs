//! # Chain Dispatcher
//!
//! Routes each transaction addressed to this node to the protocol step named
//! by its processor, exactly once and in chain order.

use std::sync::Arc;

use dta_01_local_store::LocalStore;
use dta_03_chain_client::ChainClient;
use dta_06_order_protocol::{ChainEvents, Disposition, Outcome, ProtocolError, ProtocolResult};
use shared_types::{BlockChainTX, Processor};
use tokio::sync::{mpsc, watch};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::config::DispatcherConfig;
use crate::cursor::DispatchLedger;
use crate::errors::DispatchError;

/// What happened to one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The handler ran to completion.
    Handled(Outcome),
    /// Not handled: addressed elsewhere, behind the cursor or already processed.
    Skipped(&'static str),
    /// The handler failed and the transaction was given up.
    Dropped,
}

pub struct ChainDispatcher {
    config: DispatcherConfig,
    chain: Arc<dyn ChainClient>,
    events: Arc<dyn ChainEvents>,
    ledger: DispatchLedger,
}

impl ChainDispatcher {
    pub fn new(
        config: DispatcherConfig,
        chain: Arc<dyn ChainClient>,
        events: Arc<dyn ChainEvents>,
        store: LocalStore,
    ) -> Self {
        Self {
            config,
            chain,
            events,
            ledger: DispatchLedger::new(store),
        }
    }

    pub fn ledger(&self) -> &DispatchLedger {
        &self.ledger
    }

    // =========================================================================
    // SINGLE TRANSACTION
    // =========================================================================

    /// Handle one transaction and move the cursor past it.
    ///
    /// Errors only when dispatching must stop: a fatal protocol failure, an
    /// exhausted retry budget or a broken ledger.
    pub async fn dispatch(&self, tx: &BlockChainTX) -> Result<Dispatched, DispatchError> {
        if tx.recipient_id != self.config.node_cid {
            return Ok(Dispatched::Skipped("addressed to another node"));
        }
        let position = tx.position();
        if position <= self.ledger.cursor()? {
            return Ok(Dispatched::Skipped("at or behind cursor"));
        }
        if self.ledger.is_processed(&tx.tx_hash)? {
            self.ledger.advance(position)?;
            return Ok(Dispatched::Skipped("already processed"));
        }

        let (result, attempts) = self.handle_with_retry(tx).await;
        let dispatched = match result {
            Ok(outcome) => {
                self.log_outcome(tx, &outcome);
                self.ledger.mark_processed(&tx.tx_hash, position)?;
                Dispatched::Handled(outcome)
            }
            Err(e) => match e.disposition() {
                Disposition::Drop => {
                    warn!(
                        tx_hash = %tx.tx_hash,
                        processor = tx.processor.as_str(),
                        reference = tx.reference(),
                        error = %e,
                        "dropping transaction"
                    );
                    Dispatched::Dropped
                }
                Disposition::Retry => {
                    return Err(DispatchError::RetriesExhausted {
                        tx_hash: tx.tx_hash.clone(),
                        attempts,
                        source: e,
                    })
                }
                Disposition::Fatal => {
                    return Err(DispatchError::Fatal {
                        tx_hash: tx.tx_hash.clone(),
                        source: e,
                    })
                }
            },
        };

        self.ledger.advance(position)?;
        Ok(dispatched)
    }

    async fn route(&self, tx: &BlockChainTX) -> ProtocolResult<Outcome> {
        match tx.processor {
            Processor::None => Ok(Outcome::Ignored("informational transaction")),
            Processor::FulfillRequest => self.events.on_request(tx).await,
            Processor::FulfillResponse => self.events.on_fulfill_response(tx).await,
            Processor::FulfillSecretRequest => self.events.on_secret_request(tx).await,
            Processor::FulfillSecretResponse => self.events.on_secret_response(tx).await,
        }
    }

    async fn handle_with_retry(&self, tx: &BlockChainTX) -> (ProtocolResult<Outcome>, u32) {
        let policy = &self.config.retry;
        let mut attempt = 1;
        loop {
            match self.route(tx).await {
                Err(e) if e.disposition() == Disposition::Retry && attempt < policy.max_attempts => {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        tx_hash = %tx.tx_hash,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transaction failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return (result, attempt),
            }
        }
    }

    fn log_outcome(&self, tx: &BlockChainTX, outcome: &Outcome) {
        let processor = tx.processor.as_str();
        let reference = tx.reference();
        match outcome {
            Outcome::Posted(next) => {
                info!(processor, reference, tx_hash = %tx.tx_hash, posted = %next, "handled transaction")
            }
            Outcome::Completed => {
                info!(processor, reference, tx_hash = %tx.tx_hash, "order complete")
            }
            Outcome::Ignored(reason) => {
                debug!(processor, reference, tx_hash = %tx.tx_hash, reason, "ignored transaction")
            }
        }
    }

    // =========================================================================
    // CATCH-UP
    // =========================================================================

    /// Handle everything addressed to this node between the cursor and the
    /// chain head. Returns how many transactions were handled or dropped.
    pub async fn catch_up(&self) -> Result<usize, DispatchError> {
        let cursor = self.ledger.cursor()?;
        let latest = self.chain.latest_height().await?;
        if latest < cursor.height {
            warn!(%cursor, latest, "cursor is ahead of the chain");
            return Ok(0);
        }

        let limit = match self.config.catch_up_limit {
            0 => usize::MAX,
            n => n,
        };
        let per_page = self.config.page_size.max(1);
        let mut page = 1u32;
        let mut dispatched = 0usize;

        loop {
            let result = self
                .chain
                .search_by_recipient(&self.config.node_cid, cursor.height, latest, page, per_page)
                .await?;
            for tx in &result.txs {
                if dispatched >= limit {
                    info!(limit, "catch-up limit reached");
                    return Ok(dispatched);
                }
                if !matches!(self.dispatch(tx).await?, Dispatched::Skipped(_)) {
                    dispatched += 1;
                }
            }
            if result.txs.is_empty() || u64::from(page) * u64::from(per_page) >= result.total_count {
                break;
            }
            page += 1;
        }

        info!(dispatched, from = %cursor, to = latest, "caught up with chain");
        Ok(dispatched)
    }

    // =========================================================================
    // RUN LOOP
    // =========================================================================

    /// Subscribe, catch up, then follow the chain until `shutdown` flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), DispatchError> {
        let mut stream = self.chain.subscribe(&self.config.node_cid).await?;
        let (queue, mut queued) = mpsc::channel::<BlockChainTX>(self.config.queue_capacity.max(1));

        let node = self.config.node_cid.clone();
        let subscriber = tokio::spawn(async move {
            while let Some(tx) = stream.next().await {
                if tx.recipient_id != node {
                    debug!(tx_hash = %tx.tx_hash, "subscription delivered a foreign transaction");
                    continue;
                }
                if queue.send(tx).await.is_err() {
                    break;
                }
            }
        });
        info!(node = %self.config.node_cid, "chain subscription open");

        if *shutdown.borrow() {
            subscriber.abort();
            return Ok(());
        }
        tokio::select! {
            result = self.catch_up() => {
                if let Err(e) = result {
                    subscriber.abort();
                    return Err(e);
                }
            }
            _ = shutdown.changed() => {
                subscriber.abort();
                return Ok(());
            }
        }

        let outcome = loop {
            tokio::select! {
                _ = shutdown.changed() => break Ok(()),
                next = queued.recv() => match next {
                    Some(tx) => {
                        if let Err(e) = self.dispatch(&tx).await {
                            error!(error = %e, "dispatcher stopping");
                            break Err(e);
                        }
                    }
                    None if *shutdown.borrow() => break Ok(()),
                    None => break Err(DispatchError::SubscriptionClosed),
                },
            }
        };
        subscriber.abort();
        outcome?;

        self.drain(&mut queued).await
    }

    /// Handle what is still queued, within the grace period.
    async fn drain(&self, queued: &mut mpsc::Receiver<BlockChainTX>) -> Result<(), DispatchError> {
        let drained = tokio::time::timeout(self.config.drain_grace, async {
            let mut count = 0usize;
            while let Ok(tx) = queued.try_recv() {
                self.dispatch(&tx).await?;
                count += 1;
            }
            Ok::<_, DispatchError>(count)
        })
        .await;

        match drained {
            Ok(Ok(count)) => {
                info!(count, "dispatcher drained");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(grace_ms = self.config.drain_grace.as_millis() as u64, "drain cut short");
                Ok(())
            }
        }
    }
}
