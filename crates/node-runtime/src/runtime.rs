//! # Node Runtime
//!
//! Runs the chain dispatcher and the admin API side by side until a signal
//! arrives or either of them stops on its own.
//!
//! ## Shutdown Sequence
//!
//! 1. Flip the shutdown channel; the dispatcher closes its subscription and
//!    drains its queue, the API stops accepting connections
//! 2. Wait for both tasks, bounded by the grace period
//! 3. Flush the local store

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::api::{self, AppState};
use crate::container::NodeContainer;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct NodeRuntime {
    container: NodeContainer,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Handles of the running node.
pub struct RunningNode {
    pub dispatcher: JoinHandle<Result<()>>,
    pub api: JoinHandle<Result<()>>,
    pub api_addr: SocketAddr,
}

impl NodeRuntime {
    pub fn new(container: NodeContainer) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn container(&self) -> &NodeContainer {
        &self.container
    }

    /// Spawn the dispatcher and the admin API.
    pub async fn start(&self) -> Result<RunningNode> {
        let config = &self.container.config;
        let node = self.container.orders.node();
        info!("===========================================");
        info!("  Milagro D-TA node");
        info!("===========================================");
        info!(node_type = node.node_type.as_str(), "node type");
        info!(node_id = %node.cid, "node id");
        info!(master_fiduciary = %node.master_fiduciary_cid, "master fiduciary");
        if !config.http.oidc_provider.is_empty() {
            warn!(provider = %config.http.oidc_provider, "OIDC is configured but tokens are not validated");
        }

        let dispatcher = {
            let dispatcher = self.container.dispatcher.clone();
            let shutdown = self.shutdown_rx.clone();
            tokio::spawn(async move {
                info!("starting chain dispatcher");
                dispatcher.run(shutdown).await.context("chain dispatcher")
            })
        };

        let addr = config.http.listen_socket()?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("bind admin API on {}", addr))?;
        let api_addr = listener.local_addr()?;
        let router = api::router(
            AppState {
                orders: self.container.orders.clone(),
                content: self.container.content.clone(),
            },
            &config.http.cors_allow,
        );
        let mut shutdown = self.shutdown_rx.clone();
        let api = tokio::spawn(async move {
            info!(addr = %api_addr, "admin API listening");
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.wait_for(|stop| *stop).await;
                })
                .await
                .context("admin API")
        });

        Ok(RunningNode {
            dispatcher,
            api,
            api_addr,
        })
    }

    /// Run until ctrl-c, or until the dispatcher or the API stops by itself.
    pub async fn run_until_signal(&self) -> Result<()> {
        let RunningNode {
            mut dispatcher,
            mut api,
            ..
        } = self.start().await?;
        info!("node is running, press Ctrl+C to stop");

        let stopped = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listen for ctrl-c")?;
                info!("received interrupt");
                Ok(())
            }
            result = &mut dispatcher => flatten(result, "chain dispatcher"),
            result = &mut api => flatten(result, "admin API"),
        };
        if let Err(e) = &stopped {
            error!(error = %e, "node stopping on failure");
        }

        self.shutdown(dispatcher, api).await;
        stopped
    }

    /// Signal every task, wait for them within the grace period, then flush.
    pub async fn shutdown(&self, dispatcher: JoinHandle<Result<()>>, api: JoinHandle<Result<()>>) {
        info!("initiating graceful shutdown");
        if self.shutdown_tx.send(true).is_err() {
            warn!("no task was listening for shutdown");
        }

        let joined = tokio::time::timeout(SHUTDOWN_GRACE, async {
            for (name, handle) in [("chain dispatcher", dispatcher), ("admin API", api)] {
                if handle.is_finished() {
                    continue;
                }
                if let Err(e) = flatten(handle.await, name) {
                    warn!(task = name, error = %e, "task ended with error");
                }
            }
        })
        .await;
        if joined.is_err() {
            warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "tasks did not stop in time");
        }

        if let Err(e) = self.container.store.close() {
            error!(error = %e, "failed to flush local store");
        }
        info!("shutdown complete");
    }
}

fn flatten(result: Result<Result<()>, tokio::task::JoinError>, task: &str) -> Result<()> {
    match result {
        Ok(inner) => inner,
        Err(e) => Err(anyhow!("{} task panicked or was cancelled: {}", task, e)),
    }
}
