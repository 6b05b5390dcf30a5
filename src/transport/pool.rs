//! HTTP peer pool
//!
//! Owns the peer registry for this node and builds one [`HttpGetter`] per
//! peer address, all sharing a single `reqwest::Client`.

use crate::common::utils::is_dot_segment;
use crate::common::Config;
use crate::group::peers::{PeerGetter, PeerPicker, PeerRegistry};
use crate::transport::client::HttpGetter;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

pub struct HttpPool {
    base_path: String,
    client: reqwest::Client,
    registry: PeerRegistry,
}

impl HttpPool {
    pub fn new(
        self_addr: impl Into<String>,
        base_path: impl Into<String>,
        replicas: usize,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", e)))?;

        let self_addr: String = self_addr.into();
        Ok(Self {
            base_path: base_path.into(),
            client,
            registry: PeerRegistry::new(self_addr.trim_end_matches('/'), replicas),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.addr.clone(),
            config.base_path.clone(),
            config.replicas,
            Some(config.peer_timeout()),
        )
    }

    /// Replace the peer set with `peers` (base URLs, self included or not)
    pub fn set<S: AsRef<str>>(&self, peers: &[S]) {
        let entries: Vec<(String, Arc<dyn PeerGetter>)> = peers
            .iter()
            .map(|peer| {
                let peer = peer.as_ref().trim_end_matches('/').to_string();
                let getter: Arc<dyn PeerGetter> = Arc::new(HttpGetter::new(
                    format!("{}{}", peer, self.base_path),
                    self.client.clone(),
                ));
                (peer, getter)
            })
            .collect();

        tracing::info!(
            "[Server {}] Peer set: {:?}",
            self.registry.self_addr(),
            entries.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>()
        );
        self.registry.set(entries);
    }

    pub fn self_addr(&self) -> &str {
        self.registry.self_addr()
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn peers(&self) -> Vec<String> {
        self.registry.peers()
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }
}

impl PeerPicker for HttpPool {
    /// `.` and `..` cannot be carried in a URL path, so those keys are
    /// always loaded on this node.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        if is_dot_segment(key) {
            return None;
        }
        self.registry.pick_peer(key)
    }
}
