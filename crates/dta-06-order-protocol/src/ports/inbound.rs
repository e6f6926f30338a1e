//! Driving ports (Inbound API)

use async_trait::async_trait;
use shared_types::BlockChainTX;

use crate::api::{FinalKey, OrderRequest, OrderResponse, OrderSecretRequest, OrderView};
use crate::errors::ProtocolError;

/// Result of handling one chain transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The step ran and posted the next part under this tx hash.
    Posted(String),
    /// The step ran and the order is complete on this node.
    Completed,
    /// Nothing to do: a stale or duplicate transition.
    Ignored(&'static str),
}

/// Operations a caller starts on this node.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Principal: create an order and post part 1 to the fiduciary.
    async fn start_deposit(&self, request: OrderRequest) -> Result<OrderResponse, ProtocolError>;

    /// Principal: post part 3 for a deposited order.
    async fn start_redemption(
        &self,
        request: OrderSecretRequest,
    ) -> Result<OrderResponse, ProtocolError>;

    /// Latest on-chain state of an order this node took part in.
    async fn get_order(&self, reference: &str) -> Result<OrderView, ProtocolError>;

    /// Order references by creation time.
    async fn list_orders(
        &self,
        skip: usize,
        limit: usize,
        reverse: bool,
    ) -> Result<Vec<String>, ProtocolError>;

    /// Beneficiary: the reconstructed key for a completed order.
    async fn final_key(&self, reference: &str) -> Result<FinalKey, ProtocolError>;
}

/// Protocol steps driven by incoming chain transactions, one per processor.
#[async_trait]
pub trait ChainEvents: Send + Sync {
    /// Fiduciary: part 1 arrived.
    async fn on_request(&self, tx: &BlockChainTX) -> Result<Outcome, ProtocolError>;

    /// Principal: part 2 arrived.
    async fn on_fulfill_response(&self, tx: &BlockChainTX) -> Result<Outcome, ProtocolError>;

    /// Fiduciary: part 3 arrived.
    async fn on_secret_request(&self, tx: &BlockChainTX) -> Result<Outcome, ProtocolError>;

    /// Beneficiary: part 4 arrived.
    async fn on_secret_response(&self, tx: &BlockChainTX) -> Result<Outcome, ProtocolError>;
}
