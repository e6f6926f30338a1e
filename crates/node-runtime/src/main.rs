//! # Milagro D-TA Node
//!
//! ```text
//! dta-node init   [--nodename N] [--masterfiduciarynode CID[,ADDR]] [--service P] ...
//! dta-node daemon [--service P]
//! ```
//!
//! ## Startup Sequence (daemon)
//!
//! 1. Resolve the home directory (`DTA_HOME`), load `config.yaml`
//! 2. Take the home lock, install logging
//! 3. Open local store, content store, chain client and key file
//! 4. Check the node identity against its published IDDoc
//! 5. Start the chain dispatcher and the admin API
//!
//! Exit code 0 after a graceful stop, 1 on any startup or runtime failure.

use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use node_runtime::container::config::LogConfig;
use node_runtime::logging::init_logging;
use node_runtime::{init_node, Config, InitOptions, NodeContainer, NodeHome, NodeParts, NodeRuntime};
use shared_types::NodeType;

#[derive(Parser)]
#[command(name = "dta-node")]
#[command(about = "Milagro Distributed Trust Authority node", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the configuration and a new node identity
    Init {
        /// Node name; a random one when omitted
        #[arg(long = "nodename")]
        node_name: Option<String>,

        /// Master fiduciary as `<cid>` or `<cid>,<address>`
        #[arg(long = "masterfiduciarynode")]
        master_fiduciary: Option<String>,

        /// Service plugin: bitcoinwallet, safeguardsecret or milagro
        #[arg(long)]
        service: Option<String>,

        /// multi, principal, fiduciary or masterfiduciary
        #[arg(long = "nodetype")]
        node_type: Option<String>,

        /// Chain node RPC address
        #[arg(long = "broadcastnode")]
        broadcast_node: Option<String>,

        /// Use the IPFS HTTP API at this address instead of the embedded store
        #[arg(long = "ipfsapi")]
        ipfs_api: Option<String>,
    },

    /// Start the node
    Daemon {
        /// Override the configured service plugin
        #[arg(long)]
        service: Option<String>,
    },
}

async fn run_init(home: NodeHome, options: InitOptions) -> Result<()> {
    init_logging(&LogConfig::default())?;
    let config = init_node(&home, options).await?;
    info!(home = %home.root().display(), node_id = %config.node.node_id, "node initialised");
    Ok(())
}

async fn run_daemon(home: NodeHome, service: Option<String>) -> Result<()> {
    let mut config = Config::load(home.root())?;
    let _lock = home.lock()?;
    if let Some(service) = service {
        config.plugins.service = service;
    }
    init_logging(&config.log)?;
    info!(home = %home.root().display(), "loading node");

    let parts = NodeParts::open(&config, &home).await?;
    let container = NodeContainer::assemble(config, parts).await?;
    NodeRuntime::new(container).run_until_signal().await
}

async fn run(cli: Cli) -> Result<()> {
    let home = NodeHome::from_env()?;
    match cli.command {
        Command::Init {
            node_name,
            master_fiduciary,
            service,
            node_type,
            broadcast_node,
            ipfs_api,
        } => {
            let node_type = node_type
                .map(|t| NodeType::from_str(&t.to_lowercase()))
                .transpose()
                .context("--nodetype")?;
            run_init(
                home,
                InitOptions {
                    node_name,
                    master_fiduciary,
                    node_type,
                    service,
                    broadcast_node,
                    ipfs_api,
                },
            )
            .await
        }
        Command::Daemon { service } => run_daemon(home, service).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
