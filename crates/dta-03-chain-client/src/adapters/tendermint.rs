//! # Tendermint Client
//!
//! JSON-RPC over HTTP for posting and searching, and the `/websocket`
//! endpoint for live delivery.
//!
//! | Operation | RPC |
//! |-----------|-----|
//! | `post_tx` | `broadcast_tx_commit` with the base64 JSON transaction |
//! | `get_tx` | `tx_search` on `tag.txhash='<hash>'` |
//! | `search_by_recipient` | `tx_search` on `tag.recipient` and a height range |
//! | `latest_height` | `status` → `sync_info.latest_block_height` |
//! | `subscribe` | websocket `subscribe` on `tm.event='Tx' AND tag.recipient` |
//!
//! Heights arrive as JSON strings; the chain stores our transaction as the
//! JSON serialization of [`BlockChainTX`] and reports the position next to it.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::BlockChainTX;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::tungstenite::Message;

use crate::errors::ChainError;
use crate::ports::{ChainClient, SearchPage, TxStream};

/// Timeout for every HTTP call, including the commit wait.
const NODE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Buffered live transactions per subscription.
const SUBSCRIPTION_BUFFER: usize = 1000;

const RPC_ID: &str = "dta";

// =============================================================================
// WIRE TYPES
// =============================================================================

mod wire {
    use super::*;

    #[derive(Deserialize)]
    pub struct RpcResponse<T> {
        pub result: Option<T>,
        pub error: Option<RpcError>,
    }

    #[derive(Deserialize)]
    pub struct RpcError {
        pub code: i64,
        pub message: String,
        #[serde(default)]
        pub data: String,
    }

    #[derive(Deserialize, Default)]
    pub struct TxCode {
        #[serde(default)]
        pub code: u32,
        #[serde(default)]
        pub log: String,
    }

    #[derive(Deserialize)]
    pub struct BroadcastCommit {
        #[serde(default)]
        pub check_tx: TxCode,
        #[serde(default)]
        pub deliver_tx: TxCode,
    }

    #[derive(Deserialize)]
    pub struct SearchResult {
        #[serde(default)]
        pub txs: Vec<ResultTx>,
        #[serde(deserialize_with = "u64_from_string_or_number")]
        pub total_count: u64,
    }

    #[derive(Deserialize)]
    pub struct ResultTx {
        #[serde(deserialize_with = "u64_from_string_or_number")]
        pub height: u64,
        #[serde(default)]
        pub index: u32,
        pub tx: String,
    }

    #[derive(Deserialize)]
    pub struct Status {
        pub sync_info: SyncInfo,
    }

    #[derive(Deserialize)]
    pub struct SyncInfo {
        #[serde(deserialize_with = "u64_from_string_or_number")]
        pub latest_block_height: u64,
    }

    #[derive(Deserialize)]
    pub struct TxEvent {
        pub data: EventData,
    }

    #[derive(Deserialize)]
    pub struct EventData {
        pub value: EventValue,
    }

    #[derive(Deserialize)]
    pub struct EventValue {
        #[serde(rename = "TxResult")]
        pub tx_result: ResultTx,
    }

    pub fn u64_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => s.parse().map_err(serde::de::Error::custom),
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| serde::de::Error::custom("negative height")),
            other => Err(serde::de::Error::custom(format!("expected height, got {}", other))),
        }
    }
}

/// Decode a chain-stored transaction and stamp its position.
fn decode_result_tx(result: wire::ResultTx) -> Result<BlockChainTX, ChainError> {
    let raw = STANDARD
        .decode(result.tx.as_bytes())
        .map_err(|e| ChainError::invalid(format!("tx is not base64: {}", e)))?;
    let mut tx: BlockChainTX = serde_json::from_slice(&raw)
        .map_err(|e| ChainError::invalid(format!("tx is not a BlockChainTX: {}", e)))?;
    tx.height = result.height;
    tx.index = result.index;
    Ok(tx)
}

/// Parse one websocket frame. `Ok(None)` for frames that carry no transaction
/// (the subscribe acknowledgement, for instance).
pub fn parse_tx_event(frame: &str) -> Result<Option<BlockChainTX>, ChainError> {
    let response: wire::RpcResponse<Value> =
        serde_json::from_str(frame).map_err(|e| ChainError::invalid(e.to_string()))?;
    if let Some(err) = response.error {
        return Err(ChainError::transport(format!("{} {}", err.message, err.data)));
    }
    let result = match response.result {
        Some(result) if result.get("data").is_some() => result,
        _ => return Ok(None),
    };
    let event: wire::TxEvent =
        serde_json::from_value(result).map_err(|e| ChainError::invalid(e.to_string()))?;
    decode_result_tx(event.data.value.tx_result).map(Some)
}

// =============================================================================
// CLIENT
// =============================================================================

/// [`ChainClient`] against a Tendermint RPC endpoint.
pub struct TendermintClient {
    http: reqwest::Client,
    rpc_url: String,
    ws_url: String,
}

impl TendermintClient {
    /// Client for the node at `addr` (`host:port`, or a full `http://` URL).
    pub fn new(addr: &str) -> Result<Self, ChainError> {
        let addr = addr.trim().trim_end_matches('/');
        let host = addr
            .strip_prefix("http://")
            .or_else(|| addr.strip_prefix("tcp://"))
            .unwrap_or(addr);
        if host.is_empty() {
            return Err(ChainError::transport("empty chain node address"));
        }
        let http = reqwest::Client::builder()
            .timeout(NODE_CONNECTION_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            rpc_url: format!("http://{}", host),
            ws_url: format!("ws://{}/websocket", host),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": RPC_ID,
            "method": method,
            "params": params,
        });
        let response = self
            .http
            .post(&self.rpc_url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body.to_string())
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() && !text.trim_start().starts_with('{') {
            return Err(ChainError::transport(format!("{} returned {}", method, status)));
        }

        let parsed: wire::RpcResponse<T> =
            serde_json::from_str(&text).map_err(|e| ChainError::invalid(format!("{}: {}", method, e)))?;
        if let Some(err) = parsed.error {
            return Err(ChainError::transport(format!(
                "{} failed ({}): {} {}",
                method, err.code, err.message, err.data
            )));
        }
        parsed
            .result
            .ok_or_else(|| ChainError::invalid(format!("{}: missing result", method)))
    }

    async fn tx_search(&self, query: String, page: u32, per_page: u32) -> Result<SearchPage, ChainError> {
        let result: wire::SearchResult = self
            .call(
                "tx_search",
                json!({
                    "query": query,
                    "prove": false,
                    "page": page.to_string(),
                    "per_page": per_page.to_string(),
                }),
            )
            .await?;
        let txs = result
            .txs
            .into_iter()
            .map(decode_result_tx)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SearchPage {
            txs,
            total_count: result.total_count,
        })
    }
}

#[async_trait]
impl ChainClient for TendermintClient {
    async fn post_tx(&self, tx: &BlockChainTX) -> Result<String, ChainError> {
        let json = serde_json::to_vec(tx).map_err(|e| ChainError::invalid(e.to_string()))?;
        let result: wire::BroadcastCommit = self
            .call("broadcast_tx_commit", json!({ "tx": STANDARD.encode(json) }))
            .await?;

        for outcome in [&result.check_tx, &result.deliver_tx] {
            if outcome.code != 0 {
                return Err(ChainError::Rejected {
                    code: outcome.code,
                    log: outcome.log.clone(),
                });
            }
        }
        tracing::debug!(
            tx_hash = %tx.tx_hash,
            processor = tx.processor.as_str(),
            recipient = %tx.recipient_id,
            "posted transaction"
        );
        Ok(tx.tx_hash.clone())
    }

    async fn get_tx(&self, tx_hash: &str) -> Result<BlockChainTX, ChainError> {
        let page = self
            .tx_search(format!("tag.txhash='{}'", tx_hash), 1, 1)
            .await?;
        page.txs
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::NotFound(tx_hash.to_string()))
    }

    async fn subscribe(&self, recipient: &str) -> Result<TxStream, ChainError> {
        let (mut ws, _) = tokio_tungstenite::connect_async(self.ws_url.as_str())
            .await
            .map_err(|e| ChainError::transport(format!("websocket connect: {}", e)))?;

        let request = json!({
            "jsonrpc": "2.0",
            "id": RPC_ID,
            "method": "subscribe",
            "params": { "query": format!("tm.event='Tx' AND tag.recipient='{}'", recipient) },
        });
        ws.send(Message::Text(request.to_string()))
            .await
            .map_err(|e| ChainError::transport(format!("websocket subscribe: {}", e)))?;

        let (tx_out, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let recipient = recipient.to_string();
        tokio::spawn(async move {
            while let Some(frame) = ws.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Ping(payload)) => {
                        if ws.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "chain websocket error");
                        break;
                    }
                };
                match parse_tx_event(&text) {
                    Ok(Some(tx)) if tx.recipient_id == recipient => {
                        if tx_out.send(tx).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(tx)) => {
                        tracing::debug!(tx_hash = %tx.tx_hash, "ignoring event for another recipient");
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "unreadable chain event"),
                }
            }
            tracing::info!("chain subscription closed");
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn search_by_recipient(
        &self,
        recipient: &str,
        min_height: u64,
        max_height: u64,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, ChainError> {
        let query = format!(
            "tag.recipient='{}' AND tx.height>={} AND tx.height<={}",
            recipient, min_height, max_height
        );
        self.tx_search(query, page, per_page).await
    }

    async fn latest_height(&self) -> Result<u64, ChainError> {
        let status: wire::Status = self.call("status", json!({})).await?;
        Ok(status.sync_info.latest_block_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;
    use shared_types::Processor;
    use std::sync::Arc;

    fn sample_tx() -> BlockChainTX {
        BlockChainTX::new(
            Processor::FulfillRequest,
            "QmSender",
            "QmRecipient",
            "ref-1",
            b"envelope".to_vec(),
        )
    }

    fn stored(tx: &BlockChainTX, height: u64, index: u32) -> Value {
        json!({
            "hash": tx.tx_hash.to_uppercase(),
            "height": height.to_string(),
            "index": index,
            "tx_result": {},
            "tx": STANDARD.encode(serde_json::to_vec(tx).unwrap()),
        })
    }

    /// JSON-RPC mock answering by method name.
    async fn mock_node(tx: BlockChainTX, reject: bool) -> String {
        let tx = Arc::new(tx);
        let app = Router::new().route(
            "/",
            post(move |body: String| {
                let tx = tx.clone();
                async move {
                    let request: Value = serde_json::from_str(&body).unwrap();
                    let result = match request["method"].as_str().unwrap() {
                        "broadcast_tx_commit" => {
                            let code = if reject { 4 } else { 0 };
                            json!({
                                "check_tx": { "code": 0 },
                                "deliver_tx": { "code": code, "log": "bad order" },
                                "hash": tx.tx_hash.to_uppercase(),
                                "height": "7",
                            })
                        }
                        "status" => json!({ "sync_info": { "latest_block_height": "42" } }),
                        "tx_search" => {
                            let query = request["params"]["query"].as_str().unwrap();
                            if query.contains(&tx.tx_hash) || query.contains("tag.recipient") {
                                json!({ "txs": [stored(&tx, 7, 2)], "total_count": "1" })
                            } else {
                                json!({ "txs": [], "total_count": "0" })
                            }
                        }
                        other => panic!("unexpected method {}", other),
                    };
                    json!({ "jsonrpc": "2.0", "id": "dta", "result": result }).to_string()
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr.to_string()
    }

    #[tokio::test]
    async fn test_post_get_and_status() {
        let tx = sample_tx();
        let client = TendermintClient::new(&mock_node(tx.clone(), false).await).unwrap();

        assert_eq!(client.post_tx(&tx).await.unwrap(), tx.tx_hash);
        assert_eq!(client.latest_height().await.unwrap(), 42);

        let fetched = client.get_tx(&tx.tx_hash).await.unwrap();
        assert_eq!(fetched.payload, tx.payload);
        assert_eq!((fetched.height, fetched.index), (7, 2));

        assert!(matches!(
            client.get_tx(&"ab".repeat(32)).await,
            Err(ChainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_by_recipient() {
        let tx = sample_tx();
        let client = TendermintClient::new(&mock_node(tx.clone(), false).await).unwrap();
        let page = client
            .search_by_recipient("QmRecipient", 1, 42, 1, 5)
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.txs[0].tx_hash, tx.tx_hash);
    }

    #[tokio::test]
    async fn test_deliver_failure_is_rejection() {
        let tx = sample_tx();
        let client = TendermintClient::new(&mock_node(tx.clone(), true).await).unwrap();
        match client.post_tx(&tx).await {
            Err(ChainError::Rejected { code, log }) => {
                assert_eq!(code, 4);
                assert_eq!(log, "bad order");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let client = TendermintClient::new(&format!("127.0.0.1:{}", port)).unwrap();
        assert!(client.latest_height().await.unwrap_err().is_transport());
    }

    #[test]
    fn test_parse_tx_event_frames() {
        let tx = sample_tx();
        let ack = r#"{"jsonrpc":"2.0","id":"dta","result":{}}"#;
        assert!(parse_tx_event(ack).unwrap().is_none());

        let event = json!({
            "jsonrpc": "2.0",
            "id": "dta#event",
            "result": {
                "query": "tm.event='Tx'",
                "data": {
                    "type": "tendermint/event/Tx",
                    "value": { "TxResult": stored(&tx, 9, 1) },
                },
            },
        });
        let parsed = parse_tx_event(&event.to_string()).unwrap().unwrap();
        assert_eq!(parsed.tx_hash, tx.tx_hash);
        assert_eq!(parsed.position().to_string(), "9.1");

        assert!(parse_tx_event("not json").is_err());
    }

    #[test]
    fn test_address_forms() {
        let client = TendermintClient::new("http://node:26657/").unwrap();
        assert_eq!(client.rpc_url, "http://node:26657");
        assert_eq!(client.ws_url, "ws://node:26657/websocket");
        assert!(TendermintClient::new("  ").is_err());
    }
}
