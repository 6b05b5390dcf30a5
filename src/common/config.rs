//! Configuration for a ringcache node

use crate::common::hash::DEFAULT_REPLICAS;
use crate::common::utils::normalize_base_path;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default prefix for the peer protocol
pub const DEFAULT_BASE_PATH: &str = "/_ringcache/";

/// Environment variable prefix (`RINGCACHE_CACHE_BYTES=4096`, ...)
pub const ENV_PREFIX: &str = "RINGCACHE";

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// This node's base URL, as it appears in the peer list
    pub addr: String,

    /// Socket address to bind; derived from `addr` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    /// Full peer list (base URLs)
    pub peers: Vec<String>,

    /// Virtual points per node on the hash ring
    pub replicas: usize,

    /// Path prefix of the peer protocol
    pub base_path: String,

    /// Byte budget of the group's local cache (0 = unlimited)
    pub cache_bytes: usize,

    /// Name of the group served by this node
    pub group: String,

    /// Bind address of the front-end API (disabled when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_addr: Option<String>,

    /// Timeout applied by the HTTP transport to peer fetches
    pub peer_timeout_ms: u64,

    /// Logging level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "http://localhost:8001".to_string(),
            bind: None,
            peers: Vec::new(),
            replicas: DEFAULT_REPLICAS,
            base_path: DEFAULT_BASE_PATH.to_string(),
            cache_bytes: 2 << 10,
            group: "scores".to_string(),
            api_addr: None,
            peer_timeout_ms: 3000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load defaults, then an optional TOML file, then `RINGCACHE_*` variables.
    ///
    /// Without an explicit path, `ringcache.toml` in the working directory is
    /// read if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name("ringcache").required(false),
        };

        let mut cfg: Config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("peers"),
            )
            .build()?
            .try_deserialize()?;

        cfg.base_path = normalize_base_path(&cfg.base_path);
        Ok(cfg)
    }

    /// Reject configurations a node cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.replicas == 0 {
            return Err(Error::InvalidConfig("replicas must be at least 1".into()));
        }
        if self.group.is_empty() {
            return Err(Error::InvalidConfig("group name cannot be empty".into()));
        }
        if !self.base_path.starts_with('/') || !self.base_path.ends_with('/') {
            return Err(Error::InvalidConfig(format!(
                "base path must start and end with '/': {}",
                self.base_path
            )));
        }
        if self.addr.is_empty() {
            return Err(Error::InvalidConfig("node address cannot be empty".into()));
        }
        if !self.peers.is_empty() && !self.peers.contains(&self.addr) {
            tracing::warn!(
                "Node address {} is not in the peer list; it will never own keys",
                self.addr
            );
        }
        Ok(())
    }

    /// Address the peer server listens on
    pub fn listen_addr(&self) -> String {
        match &self.bind {
            Some(bind) => bind.clone(),
            None => strip_scheme(&self.addr).to_string(),
        }
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}

fn strip_scheme(addr: &str) -> &str {
    let rest = addr
        .strip_prefix("http://")
        .or_else(|| addr.strip_prefix("https://"))
        .unwrap_or(addr);
    rest.trim_end_matches('/')
}
