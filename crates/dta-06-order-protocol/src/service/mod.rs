//! # Order Service
//!
//! One [`OrderService`] per node plays every role the node is asked to:
//!
//! - `principal` - starts deposits and redemptions, computes the joint commitment
//! - `fiduciary` - answers parts 1 and 3 with its share
//! - `beneficiary` - reconstructs the final key from parts 3 and 4
//! - `queries` - read-only views over the order book
//!
//! Every incoming transaction is opened the same way: the payload must hash
//! to `tx_hash`, the envelope signer must be the tx sender, and the signature
//! is checked against the sender's published IDDoc.

mod beneficiary;
mod fiduciary;
mod principal;
mod queries;

use std::sync::Arc;

use async_trait::async_trait;
use dta_01_local_store::LocalStore;
use dta_02_content_store::ContentStore;
use dta_03_chain_client::{ChainClient, ChainError};
use dta_04_envelope::{
    decode_order, peek_signer, BeneficiaryType, Header, IdDocument, OrderDocument, Recipients,
};
use dta_05_identity::{retrieve_iddoc, Keyring};
use shared_crypto::{redeem_public_key, sha256};
use shared_types::{BlockChainTX, NodeType, Processor};

use crate::api::{FinalKey, OrderRequest, OrderResponse, OrderSecretRequest, OrderView};
use crate::errors::{ProtocolError, ProtocolResult};
use crate::plugins::{plugin_by_name, ServicePlugin};
use crate::ports::{ChainEvents, OrderApi, Outcome};
use crate::state::OrderBook;

/// Length of the per-order share seed.
pub const SHARE_SEED_LEN: usize = 32;

/// Who this node is.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    /// CID of this node's IDDoc.
    pub cid: String,
    /// Authentication reference published in the IDDoc.
    pub name: String,
    pub node_type: NodeType,
    /// Counterparty for deposits this node starts.
    pub master_fiduciary_cid: String,
}

/// Collaborators for [`OrderService`].
pub struct ProtocolDependencies {
    pub keyring: Arc<Keyring>,
    pub store: LocalStore,
    pub content: Arc<dyn ContentStore>,
    pub chain: Arc<dyn ChainClient>,
    /// Plugin for orders this node creates.
    pub plugin: Arc<dyn ServicePlugin>,
}

pub struct OrderService {
    node: NodeIdentity,
    keyring: Arc<Keyring>,
    book: OrderBook,
    content: Arc<dyn ContentStore>,
    chain: Arc<dyn ChainClient>,
    plugin: Arc<dyn ServicePlugin>,
}

impl OrderService {
    pub fn new(node: NodeIdentity, deps: ProtocolDependencies) -> Self {
        Self {
            node,
            keyring: deps.keyring,
            book: OrderBook::new(deps.store),
            content: deps.content,
            chain: deps.chain,
            plugin: deps.plugin,
        }
    }

    pub fn node(&self) -> &NodeIdentity {
        &self.node
    }

    pub fn plugin(&self) -> &dyn ServicePlugin {
        self.plugin.as_ref()
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    // === PEERS ===

    fn own_iddoc(&self) -> IdDocument {
        self.keyring.iddoc(&self.node.name, 0)
    }

    /// IDDoc for `cid`, fetched fresh from the content store.
    async fn iddoc(&self, cid: &str) -> ProtocolResult<IdDocument> {
        if cid == self.node.cid {
            return Ok(self.own_iddoc());
        }
        Ok(retrieve_iddoc(self.content.as_ref(), cid).await?)
    }

    async fn recipients(&self, cids: &[&str]) -> ProtocolResult<Recipients> {
        let mut recipients = Recipients::new();
        for cid in cids {
            recipients.insert(cid.to_string(), self.iddoc(cid).await?);
        }
        Ok(recipients)
    }

    // === ENVELOPES ===

    /// Authenticate and decrypt the order carried by `tx`.
    async fn open(&self, tx: &BlockChainTX) -> ProtocolResult<(Header, OrderDocument)> {
        if !tx.hash_matches_payload() {
            return Err(ProtocolError::violation(format!(
                "tx {} does not hash to its payload",
                tx.tx_hash
            )));
        }
        let signer = peek_signer(&tx.payload)?;
        if signer != tx.sender_id {
            return Err(ProtocolError::violation(format!(
                "tx {} sent by {} but signed by {}",
                tx.tx_hash, tx.sender_id, signer
            )));
        }
        let signer_doc = self.iddoc(&signer).await?;
        let (header, order) = decode_order(
            &tx.payload,
            &tx.tx_hash,
            self.keyring.reader(&self.node.cid),
            Some(&signer_doc.bls_public_key),
        )?;
        if order.reference != tx.reference() {
            return Err(ProtocolError::violation(format!(
                "tx {} tagged {} carries order {}",
                tx.tx_hash,
                tx.reference(),
                order.reference
            )));
        }
        Ok((header, order))
    }

    async fn post(
        &self,
        processor: Processor,
        recipient: &str,
        reference: &str,
        payload: Vec<u8>,
    ) -> ProtocolResult<String> {
        let tx = BlockChainTX::new(processor, self.node.cid.clone(), recipient, reference, payload);
        let tx_hash = self.chain.post_tx(&tx).await?;
        tracing::info!(
            reference,
            tx_hash = %tx_hash,
            processor = %processor,
            recipient,
            "posted order part"
        );
        Ok(tx_hash)
    }

    /// Fetch `previous` and check it is the `expected` part of `reference`.
    async fn check_link(
        &self,
        previous: &str,
        expected: Processor,
        reference: &str,
    ) -> ProtocolResult<BlockChainTX> {
        let prior = match self.chain.get_tx(previous).await {
            Ok(tx) => tx,
            Err(ChainError::NotFound(_)) => {
                return Err(ProtocolError::violation(format!(
                    "previous part {} is not on chain",
                    previous
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if prior.processor != expected || prior.reference() != reference {
            return Err(ProtocolError::violation(format!(
                "previous part {} is {} of {}, expected {} of {}",
                previous,
                prior.processor,
                prior.reference(),
                expected,
                reference
            )));
        }
        Ok(prior)
    }

    /// Plugin named by the order's `type`.
    fn plugin_for(&self, order: &OrderDocument) -> ProtocolResult<Arc<dyn ServicePlugin>> {
        if order.r#type == self.plugin.name() {
            Ok(Arc::clone(&self.plugin))
        } else {
            plugin_by_name(&order.r#type)
        }
    }

    /// Public key of the principal's share of `order`.
    async fn principal_share_public_key(
        &self,
        order: &OrderDocument,
        seed: &[u8],
        modifier: &str,
    ) -> ProtocolResult<String> {
        match order.beneficiary_kind() {
            BeneficiaryType::KnownAtStart => {
                let doc = self.iddoc(&order.beneficiary_cid).await?;
                Ok(hex::encode(doc.beneficiary_ec_public_key))
            }
            BeneficiaryType::UnknownAtStart => Ok(redeem_public_key(&share_entropy(seed, modifier))?),
            BeneficiaryType::Unspecified => Err(ProtocolError::violation(format!(
                "order {} has no beneficiary type",
                order.reference
            ))),
        }
    }
}

/// Hex entropy of the principal's share: `SHA-256(seed ‖ modifier)`.
pub(crate) fn share_entropy(seed: &[u8], modifier: &str) -> String {
    let mut input = seed.to_vec();
    input.extend_from_slice(modifier.as_bytes());
    hex::encode(sha256(&input))
}

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn require_part<'a, T>(part: &'a Option<T>, name: &str, reference: &str) -> ProtocolResult<&'a T> {
    part.as_ref()
        .ok_or_else(|| ProtocolError::violation(format!("order {} lacks {}", reference, name)))
}

#[async_trait]
impl OrderApi for OrderService {
    async fn start_deposit(&self, request: OrderRequest) -> ProtocolResult<OrderResponse> {
        OrderService::start_deposit(self, request).await
    }

    async fn start_redemption(&self, request: OrderSecretRequest) -> ProtocolResult<OrderResponse> {
        OrderService::start_redemption(self, request).await
    }

    async fn get_order(&self, reference: &str) -> ProtocolResult<OrderView> {
        OrderService::get_order(self, reference).await
    }

    async fn list_orders(&self, skip: usize, limit: usize, reverse: bool) -> ProtocolResult<Vec<String>> {
        self.book.list_orders(skip, limit, reverse)
    }

    async fn final_key(&self, reference: &str) -> ProtocolResult<FinalKey> {
        self.book.final_key(reference)
    }
}

#[async_trait]
impl ChainEvents for OrderService {
    async fn on_request(&self, tx: &BlockChainTX) -> ProtocolResult<Outcome> {
        OrderService::on_request(self, tx).await
    }

    async fn on_fulfill_response(&self, tx: &BlockChainTX) -> ProtocolResult<Outcome> {
        OrderService::on_fulfill_response(self, tx).await
    }

    async fn on_secret_request(&self, tx: &BlockChainTX) -> ProtocolResult<Outcome> {
        OrderService::on_secret_request(self, tx).await
    }

    async fn on_secret_response(&self, tx: &BlockChainTX) -> ProtocolResult<Outcome> {
        OrderService::on_secret_response(self, tx).await
    }
}
