//! # IPFS HTTP API Store
//!
//! Talks to an external IPFS daemon through its RPC API:
//!
//! - `POST /api/v0/id` on connect, to check the node is up
//! - `POST /api/v0/add?pin=true` to store a document
//! - `POST /api/v0/cat?arg=<cid>` then `POST /api/v0/pin/add?arg=<cid>` to fetch one
//!
//! CIDs returned here are whatever the daemon assigns; content verification is
//! left to IPFS itself.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::errors::ContentStoreError;
use crate::ports::{check_cid, ContentStore};

/// Request timeout for every API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct IdResponse {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(rename = "Message")]
    message: String,
}

/// Turn a config address into an HTTP base URL.
///
/// Accepts `http(s)://host:port`, `host:port` and the multiaddr forms
/// `/ip4/<host>/tcp/<port>`, `/ip6/...`, `/dns4/...`, `/dns/...`.
pub fn api_base_url(addr: &str) -> Result<String, ContentStoreError> {
    let addr = addr.trim();
    if addr.starts_with("http://") || addr.starts_with("https://") {
        return Ok(addr.trim_end_matches('/').to_string());
    }
    if let Some(rest) = addr.strip_prefix('/') {
        let parts: Vec<&str> = rest.split('/').collect();
        return match parts.as_slice() {
            ["ip4" | "dns" | "dns4" | "dns6", host, "tcp", port, ..] => {
                Ok(format!("http://{}:{}", host, port))
            }
            ["ip6", host, "tcp", port, ..] => Ok(format!("http://[{}]:{}", host, port)),
            _ => Err(ContentStoreError::Connection {
                message: format!("unsupported multiaddr {}", addr),
            }),
        };
    }
    if addr.is_empty() {
        return Err(ContentStoreError::Connection {
            message: "empty IPFS API address".to_string(),
        });
    }
    Ok(format!("http://{}", addr))
}

/// [`ContentStore`] over an IPFS daemon's HTTP API.
pub struct IpfsApiStore {
    client: reqwest::Client,
    base_url: String,
    node_id: String,
}

impl IpfsApiStore {
    /// Connect to the daemon at `addr` and read its peer ID.
    pub async fn connect(addr: &str) -> Result<Self, ContentStoreError> {
        let base_url = api_base_url(addr)?;
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        let response = client
            .post(format!("{}/api/v0/id", base_url))
            .send()
            .await?;
        let response = Self::check_status(response, "").await?;
        let IdResponse { id } = response.json().await?;
        tracing::info!(node_id = %id, url = %base_url, "connected to IPFS API");

        Ok(Self {
            client,
            base_url,
            node_id: id,
        })
    }

    async fn check_status(
        response: reqwest::Response,
        cid: &str,
    ) -> Result<reqwest::Response, ContentStoreError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.message,
            Err(_) => status.to_string(),
        };
        if message.contains("not found") && !cid.is_empty() {
            return Err(ContentStoreError::NotFound(cid.to_string()));
        }
        Err(ContentStoreError::Connection { message })
    }
}

#[async_trait]
impl ContentStore for IpfsApiStore {
    fn id(&self) -> String {
        self.node_id.clone()
    }

    async fn put(&self, data: Vec<u8>) -> Result<String, ContentStoreError> {
        let form = Form::new().part("file", Part::bytes(data).file_name("document"));
        let response = self
            .client
            .post(format!("{}/api/v0/add", self.base_url))
            .query(&[("pin", "true"), ("progress", "false")])
            .multipart(form)
            .send()
            .await?;
        let AddResponse { hash } = Self::check_status(response, "").await?.json().await?;
        Ok(hash)
    }

    async fn get(&self, cid: &str) -> Result<Vec<u8>, ContentStoreError> {
        check_cid(cid)?;
        let response = self
            .client
            .post(format!("{}/api/v0/cat", self.base_url))
            .query(&[("arg", cid)])
            .send()
            .await?;
        let data = Self::check_status(response, cid).await?.bytes().await?.to_vec();

        let pin = self
            .client
            .post(format!("{}/api/v0/pin/add", self.base_url))
            .query(&[("arg", cid)])
            .send()
            .await;
        if let Err(e) = pin {
            tracing::warn!(cid, error = %e, "failed to pin fetched document");
        }
        Ok(data)
    }
}
