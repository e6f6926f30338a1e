//! # Node Configuration
//!
//! `<home>/config.yaml`, written by `init` and read by `daemon`.
//!
//! ```yaml
//! node:
//!   nodeID: Qm...
//!   nodeName: alice
//!   masterFiduciaryNodeID: Qm...
//!   nodeType: multi
//!   dataStore: embedded
//! ipfs:
//!   connector: embedded
//! blockchain:
//!   broadcastNode: 127.0.0.1:26657
//!   catchUpLimit: 0
//! ```
//!
//! Missing sections and keys take their defaults. `DTA_LOG_LEVEL` overrides
//! `log.level` after loading.

use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Overrides `log.level`.
pub const ENV_LOG_LEVEL: &str = "DTA_LOG_LEVEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("configuration not found at {}; run `init` first", .0.display())]
    NotFound(PathBuf),

    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub node: NodeSection,
    pub log: LogConfig,
    pub ipfs: IpfsConfig,
    pub plugins: PluginsConfig,
    pub blockchain: BlockchainConfig,
}

/// Admin HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// `host:port`, or `:port` for every interface.
    #[serde(rename = "listenAddr")]
    pub listen_addr: String,
    /// Parsed and kept; no exporter is served.
    #[serde(rename = "metricsAddr")]
    pub metrics_addr: String,
    /// Parsed and kept; tokens are not validated.
    #[serde(rename = "oidcProvider")]
    pub oidc_provider: String,
    #[serde(rename = "oidcClientID")]
    pub oidc_client_id: String,
    /// `*` or a comma separated origin list.
    #[serde(rename = "corsAllow")]
    pub cors_allow: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: ":5556".to_string(),
            metrics_addr: ":5557".to_string(),
            oidc_provider: String::new(),
            oidc_client_id: String::new(),
            cors_allow: "*".to_string(),
        }
    }
}

impl HttpConfig {
    pub fn listen_socket(&self) -> Result<SocketAddr, ConfigError> {
        let addr = self.listen_addr.trim();
        let full = if addr.starts_with(':') {
            format!("0.0.0.0{}", addr)
        } else {
            addr.to_string()
        };
        full.parse().map_err(|e| ConfigError::Invalid {
            field: "http.listenAddr",
            message: format!("{:?}: {}", addr, e),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    #[serde(rename = "nodeID")]
    pub node_id: String,
    #[serde(rename = "nodeName")]
    pub node_name: String,
    #[serde(rename = "masterFiduciaryNodeID")]
    pub master_fiduciary_node_id: String,
    #[serde(rename = "masterFiduciaryServer")]
    pub master_fiduciary_server: String,
    /// One of `multi`, `principal`, `fiduciary`, `masterfiduciary`.
    #[serde(rename = "nodeType")]
    pub node_type: String,
    /// Only `embedded` is supported.
    #[serde(rename = "dataStore")]
    pub data_store: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            node_name: String::new(),
            master_fiduciary_node_id: String::new(),
            master_fiduciary_server: "http://localhost:5556".to_string(),
            node_type: "multi".to_string(),
            data_store: "embedded".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `text` (or `fmt`), `json` or `none`.
    pub format: String,
    /// Any `EnvFilter` directive, usually a bare level.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpfsConfig {
    /// `embedded` keeps documents under `<home>/ipfs-data`; `api` talks to
    /// the daemon at `apiAddress`.
    pub connector: String,
    #[serde(rename = "apiAddress")]
    pub api_address: String,
    #[serde(rename = "listenAddress")]
    pub listen_address: String,
    pub bootstrap: Vec<String>,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            connector: "embedded".to_string(),
            api_address: "http://localhost:5001".to_string(),
            listen_address: "/ip4/0.0.0.0/tcp/4001".to_string(),
            bootstrap: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Plugin for orders this node creates.
    pub service: String,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            service: "milagro".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// Tendermint RPC `host:port`.
    #[serde(rename = "broadcastNode")]
    pub broadcast_node: String,
    /// Most transactions replayed on start; `0` replays everything.
    #[serde(rename = "catchUpLimit")]
    pub catch_up_limit: usize,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            broadcast_node: "127.0.0.1:26657".to_string(),
            catch_up_limit: 0,
        }
    }
}

impl Config {
    pub fn path(home: &Path) -> PathBuf {
        home.join(CONFIG_FILE_NAME)
    }

    /// Create `home` (0700) and write `self` as its first configuration.
    pub fn init(&self, home: &Path) -> Result<(), ConfigError> {
        let path = Self::path(home);
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path));
        }
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(home)?;
        self.save(home)
    }

    /// Read `<home>/config.yaml` and apply environment overrides.
    pub fn load(home: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(home);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path))
            }
            Err(e) => return Err(e.into()),
        };
        let mut config: Config = serde_yaml::from_str(&raw)?;
        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            config.log.level = level;
        }
        Ok(config)
    }

    /// Write `<home>/config.yaml` with mode 0600.
    pub fn save(&self, home: &Path) -> Result<(), ConfigError> {
        let raw = serde_yaml::to_string(self)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(Self::path(home))?;
        file.write_all(raw.as_bytes())?;
        Ok(())
    }
}
