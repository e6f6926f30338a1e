//! # Node Bootstrap
//!
//! `init`: write a fresh configuration, create an identity, publish its
//! IDDoc and keep the seed in the key file.

use anyhow::{bail, Context, Result};
use tracing::info;

use dta_05_identity::{create_identity, FileKeyStore, KeyStore, SEED_KEY};
use shared_crypto::random_bytes;
use shared_types::NodeType;

use crate::container::{open_content_store, Config, NodeHome};

/// Choices made at `init`.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Authentication reference; a random name when absent.
    pub node_name: Option<String>,
    /// CID of the master fiduciary; this node itself when absent.
    pub master_fiduciary: Option<String>,
    pub node_type: Option<NodeType>,
    pub service: Option<String>,
    pub broadcast_node: Option<String>,
    /// IPFS HTTP API address; the embedded store when absent.
    pub ipfs_api: Option<String>,
}

fn random_name() -> String {
    hex::encode(random_bytes(8))
}

/// Split `--masterfiduciarynode`: `<cid>` or `<cid>,<server address>`.
pub fn parse_master_fiduciary(raw: &str) -> Result<(String, Option<String>)> {
    let mut parts = raw.split(',').map(str::trim);
    let cid = parts.next().unwrap_or_default().to_string();
    let server = parts.next().map(str::to_string);
    if cid.is_empty() || parts.next().is_some() {
        bail!("invalid master fiduciary node '{}'", raw);
    }
    Ok((cid, server))
}

/// Initialise `home` and return the configuration that was written.
pub async fn init_node(home: &NodeHome, options: InitOptions) -> Result<Config> {
    let mut config = Config::default();
    config.node.node_name = match options.node_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => {
            let name = random_name();
            info!(name = %name, "node name not provided, generated one");
            name
        }
    };
    if let Some(node_type) = options.node_type {
        config.node.node_type = node_type.as_str().to_string();
    }
    if let Some(service) = options.service {
        config.plugins.service = service;
    }
    if let Some(node) = options.broadcast_node {
        config.blockchain.broadcast_node = node;
    }
    if let Some(api) = options.ipfs_api {
        config.ipfs.connector = "api".to_string();
        config.ipfs.api_address = api;
    }
    let master = options
        .master_fiduciary
        .as_deref()
        .map(parse_master_fiduciary)
        .transpose()?;

    config.init(home.root()).context("write configuration")?;
    let _lock = home.lock()?;

    let content = open_content_store(&config, home).await?;
    let keys = FileKeyStore::open(home.keys_path()).context("open key file")?;
    let (cid, keyring) = create_identity(&config.node.node_name, content.as_ref())
        .await
        .context("create identity")?;
    keys.set(SEED_KEY, keyring.seed()).context("store node seed")?;
    info!(cid = %cid, name = %config.node.node_name, "new node identity");

    config.node.node_id = cid.clone();
    match master {
        Some((fiduciary, server)) => {
            config.node.master_fiduciary_node_id = fiduciary;
            if let Some(server) = server {
                config.node.master_fiduciary_server = server;
            }
        }
        None => config.node.master_fiduciary_node_id = cid,
    }
    config.save(home.root()).context("save configuration")?;
    Ok(config)
}
