//! # Node Container
//!
//! Holds every collaborator of a running node and wires them together.
//!
//! ## Wiring Order
//!
//! ```text
//! home lock ─→ local store ─→ content store ─→ chain client
//!                                  │
//!                     key file ─→ keyring ─→ identity check
//!                                  │
//!                            order service ─→ chain dispatcher
//! ```
//!
//! The identity check runs before anything is subscribed: a node whose seed
//! no longer matches its published IDDoc must not answer orders.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use dta_01_local_store::LocalStore;
use dta_02_content_store::{ContentStore, FsContentStore, IpfsApiStore};
use dta_03_chain_client::{ChainClient, TendermintClient};
use dta_05_identity::{check_identity, FileKeyStore, KeyStore, Keyring, SEED_KEY};
use dta_06_order_protocol::{
    plugin_by_name, NodeIdentity, OrderService, ProtocolDependencies, ServicePlugin,
};
use dta_07_chain_dispatcher::{ChainDispatcher, DispatcherConfig};
use shared_types::NodeType;

use crate::container::config::Config;
use crate::container::home::NodeHome;

/// Open the content store named by `ipfs.connector`.
pub async fn open_content_store(config: &Config, home: &NodeHome) -> Result<Arc<dyn ContentStore>> {
    match config.ipfs.connector.as_str() {
        "embedded" => {
            let store = FsContentStore::open(home.content_path())
                .await
                .context("open embedded content store")?;
            Ok(Arc::new(store))
        }
        "api" | "ipfs" => {
            let store = IpfsApiStore::connect(&config.ipfs.api_address)
                .await
                .with_context(|| format!("connect to IPFS API at {}", config.ipfs.api_address))?;
            Ok(Arc::new(store))
        }
        other => bail!("unknown ipfs connector '{}'", other),
    }
}

/// Collaborators a container is assembled from.
pub struct NodeParts {
    pub store: LocalStore,
    pub content: Arc<dyn ContentStore>,
    pub chain: Arc<dyn ChainClient>,
    pub keyring: Arc<Keyring>,
}

impl NodeParts {
    /// Open the on-disk stores, the configured chain node and the key file.
    pub async fn open(config: &Config, home: &NodeHome) -> Result<Self> {
        if config.node.data_store != "embedded" {
            bail!("unknown datastore '{}'", config.node.data_store);
        }
        let store = LocalStore::open_rocksdb(home.datastore_path()).context("open local store")?;
        let content = open_content_store(config, home).await?;
        let chain = TendermintClient::new(&config.blockchain.broadcast_node)
            .with_context(|| format!("chain node {}", config.blockchain.broadcast_node))?;

        let keys = FileKeyStore::open(home.keys_path()).context("open key file")?;
        let seed = keys.get(SEED_KEY).context("read node seed")?;
        let keyring = Keyring::from_seed(&seed).context("derive node keys")?;

        Ok(Self {
            store,
            content,
            chain: Arc::new(chain),
            keyring: Arc::new(keyring),
        })
    }
}

/// Every service a running node needs.
pub struct NodeContainer {
    pub config: Config,
    pub store: LocalStore,
    pub content: Arc<dyn ContentStore>,
    pub chain: Arc<dyn ChainClient>,
    pub orders: Arc<OrderService>,
    pub dispatcher: Arc<ChainDispatcher>,
}

impl NodeContainer {
    /// Check the identity, pick the plugin and wire the protocol to the chain.
    pub async fn assemble(config: Config, parts: NodeParts) -> Result<Self> {
        let node = node_identity(&config)?;
        check_identity(parts.content.as_ref(), &node.cid, &node.name, &parts.keyring)
            .await
            .context("invalid node identity")?;

        let plugin: Arc<dyn ServicePlugin> = plugin_by_name(&config.plugins.service)
            .map_err(|e| anyhow!("plugin '{}': {}", config.plugins.service, e))?;
        info!(plugin = plugin.name(), vendor = plugin.vendor(), "service plugin loaded");

        let dispatcher_config = DispatcherConfig {
            catch_up_limit: config.blockchain.catch_up_limit,
            ..DispatcherConfig::new(node.cid.clone())
        };

        let orders = Arc::new(OrderService::new(
            node,
            ProtocolDependencies {
                keyring: parts.keyring,
                store: parts.store.clone(),
                content: Arc::clone(&parts.content),
                chain: Arc::clone(&parts.chain),
                plugin,
            },
        ));
        let dispatcher = Arc::new(ChainDispatcher::new(
            dispatcher_config,
            Arc::clone(&parts.chain),
            orders.clone(),
            parts.store.clone(),
        ));

        Ok(Self {
            config,
            store: parts.store,
            content: parts.content,
            chain: parts.chain,
            orders,
            dispatcher,
        })
    }
}

fn node_identity(config: &Config) -> Result<NodeIdentity> {
    let node = &config.node;
    if node.node_id.is_empty() {
        bail!("node.nodeID is empty; run `init` first");
    }
    let node_type = NodeType::from_str(&node.node_type.to_lowercase())
        .with_context(|| format!("node.nodeType '{}'", node.node_type))?;
    Ok(NodeIdentity {
        cid: node.node_id.clone(),
        name: node.node_name.clone(),
        node_type,
        master_fiduciary_cid: node.master_fiduciary_node_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dta_02_content_store::MemoryContentStore;
    use dta_03_chain_client::MemoryChain;
    use dta_05_identity::create_identity;

    async fn parts_for(name: &str) -> (Config, NodeParts) {
        let content = Arc::new(MemoryContentStore::new());
        let (cid, keyring) = create_identity(name, content.as_ref()).await.unwrap();
        let mut config = Config::default();
        config.node.node_id = cid;
        config.node.node_name = name.to_string();
        let parts = NodeParts {
            store: LocalStore::in_memory(),
            content,
            chain: Arc::new(MemoryChain::new()),
            keyring: Arc::new(keyring),
        };
        (config, parts)
    }

    #[tokio::test]
    async fn test_assemble_wires_configured_node() {
        let (mut config, parts) = parts_for("alice").await;
        config.node.node_type = "Principal".into();
        config.plugins.service = "bitcoinwallet".into();

        let container = NodeContainer::assemble(config.clone(), parts).await.unwrap();
        assert_eq!(container.orders.node().cid, config.node.node_id);
        assert_eq!(container.orders.node().node_type, NodeType::Principal);
        assert_eq!(container.orders.plugin().name(), "bitcoinwallet");
    }

    #[tokio::test]
    async fn test_assemble_refuses_name_mismatch() {
        let (mut config, parts) = parts_for("alice").await;
        config.node.node_name = "mallory".into();
        assert!(NodeContainer::assemble(config, parts).await.is_err());
    }

    #[tokio::test]
    async fn test_assemble_refuses_unknown_plugin_and_node_type() {
        let (mut config, parts) = parts_for("alice").await;
        config.plugins.service = "ethereum".into();
        assert!(NodeContainer::assemble(config, parts).await.is_err());

        let (mut config, parts) = parts_for("bob").await;
        config.node.node_type = "observer".into();
        assert!(NodeContainer::assemble(config, parts).await.is_err());
    }
}
