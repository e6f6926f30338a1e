//! # Federation Fixtures
//!
//! A [`Federation`] is one chain and one content store. Each [`TestNode`]
//! publishes its IDDoc there and runs its own dispatcher against the chain,
//! the way separate daemons would.

use std::sync::Arc;
use std::time::Duration;

use dta_01_local_store::LocalStore;
use dta_02_content_store::{ContentStore, MemoryContentStore};
use dta_03_chain_client::MemoryChain;
use dta_05_identity::{build_iddoc, Keyring};
use dta_06_order_protocol::{plugin_by_name, NodeIdentity, OrderService, ProtocolDependencies};
use dta_07_chain_dispatcher::{ChainDispatcher, DispatchError, DispatcherConfig, RetryPolicy};
use shared_types::NodeType;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const IDDOC_TIMESTAMP: i64 = 1_700_000_000;
const WAIT_LIMIT: Duration = Duration::from_secs(10);

pub struct Federation {
    pub chain: MemoryChain,
    pub content: Arc<MemoryContentStore>,
}

impl Default for Federation {
    fn default() -> Self {
        Self::new()
    }
}

impl Federation {
    pub fn new() -> Self {
        Self {
            chain: MemoryChain::new(),
            content: Arc::new(MemoryContentStore::new()),
        }
    }

    /// Publish the identity derived from seed byte `n` and wire its node.
    pub async fn node(&self, n: u8, node_type: NodeType, fiduciary: &str, plugin: &str) -> TestNode {
        let keyring = Keyring::from_seed(&[n; 48]).unwrap();
        let name = format!("node{}", n);
        let (_, raw) = build_iddoc(&keyring, &name, IDDOC_TIMESTAMP).unwrap();
        let cid = self.content.put(raw).await.unwrap();

        let store = LocalStore::in_memory();
        let service = Arc::new(OrderService::new(
            NodeIdentity {
                cid: cid.clone(),
                name,
                node_type,
                // A master fiduciary with no configured counterpart is its own.
                master_fiduciary_cid: if fiduciary.is_empty() {
                    cid.clone()
                } else {
                    fiduciary.to_string()
                },
            },
            ProtocolDependencies {
                keyring: Arc::new(keyring),
                store: store.clone(),
                content: self.content.clone(),
                chain: Arc::new(self.chain.clone()),
                plugin: plugin_by_name(plugin).unwrap(),
            },
        ));
        let dispatcher = Arc::new(ChainDispatcher::new(
            fast_config(&cid),
            Arc::new(self.chain.clone()),
            service.clone(),
            store.clone(),
        ));

        TestNode {
            cid,
            store,
            service,
            dispatcher,
            running: None,
        }
    }
}

fn fast_config(cid: &str) -> DispatcherConfig {
    DispatcherConfig {
        retry: RetryPolicy {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2,
            max_attempts: 4,
        },
        drain_grace: Duration::from_millis(200),
        ..DispatcherConfig::new(cid)
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<Result<(), DispatchError>>,
}

pub struct TestNode {
    pub cid: String,
    pub store: LocalStore,
    pub service: Arc<OrderService>,
    pub dispatcher: Arc<ChainDispatcher>,
    running: Option<Running>,
}

impl TestNode {
    /// Spawn the dispatcher loop; catch-up runs first.
    pub fn start(&mut self) {
        let (shutdown, rx) = watch::channel(false);
        let dispatcher = self.dispatcher.clone();
        let handle = tokio::spawn(async move { dispatcher.run(rx).await });
        self.running = Some(Running { shutdown, handle });
    }

    /// Stop the dispatcher loop and return how it ended.
    pub async fn stop(&mut self) -> Result<(), DispatchError> {
        match self.running.take() {
            Some(running) => {
                let _ = running.shutdown.send(true);
                running.handle.await.unwrap()
            }
            None => Ok(()),
        }
    }
}

/// Poll `done` until it holds, failing the test after [`WAIT_LIMIT`].
pub async fn eventually(what: &str, done: impl Fn() -> bool) {
    let waited = tokio::time::timeout(WAIT_LIMIT, async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {}", what);
}
