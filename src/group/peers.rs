//! Peer selection and remote fetch capabilities
//!
//! A [`PeerPicker`] decides which remote node owns a key; a [`PeerGetter`]
//! fetches a value from that node. [`PeerRegistry`] implements the picker
//! on top of a [`HashRing`] and is transport-agnostic: it is handed one getter
//! per peer address.

use crate::common::hash::{HashFn, HashRing};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Logical request sent to a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub group: String,
    pub key: String,
}

/// Logical response from a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub value: Vec<u8>,
}

/// Fetches values from one remote peer
#[async_trait]
pub trait PeerGetter: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

/// Locates the peer that owns a key
pub trait PeerPicker: Send + Sync {
    /// Getter for the owning peer, or `None` when the key is owned by this
    /// node or no peers are known.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

struct Topology {
    ring: HashRing,
    getters: HashMap<String, Arc<dyn PeerGetter>>,
}

/// Consistent-hash peer registry.
///
/// The ring and getter table are replaced together by [`PeerRegistry::set`];
/// there is no incremental membership change.
pub struct PeerRegistry {
    self_addr: String,
    replicas: usize,
    hash_fn: Option<HashFn>,
    topology: RwLock<Topology>,
}

impl PeerRegistry {
    pub fn new(self_addr: impl Into<String>, replicas: usize) -> Self {
        Self::with_hash(self_addr, replicas, None)
    }

    pub fn with_hash(self_addr: impl Into<String>, replicas: usize, hash_fn: Option<HashFn>) -> Self {
        Self {
            self_addr: self_addr.into(),
            replicas,
            hash_fn,
            topology: RwLock::new(Topology {
                ring: HashRing::new(replicas, hash_fn),
                getters: HashMap::new(),
            }),
        }
    }

    /// Replace the peer set. Entries pair a peer address with its getter;
    /// this node's own address may be included.
    pub fn set<I>(&self, peers: I)
    where
        I: IntoIterator<Item = (String, Arc<dyn PeerGetter>)>,
    {
        let getters: HashMap<String, Arc<dyn PeerGetter>> = peers.into_iter().collect();
        let mut ring = HashRing::new(self.replicas, self.hash_fn);
        ring.add(getters.keys().cloned());

        let mut topology = self
            .topology
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *topology = Topology { ring, getters };
    }

    /// Address that owns `key` on the ring, this node included
    pub fn owner(&self, key: &str) -> Option<String> {
        let topology = self.topology.read().unwrap_or_else(PoisonError::into_inner);
        topology.ring.get(key).map(str::to_string)
    }

    /// Known peer addresses, sorted
    pub fn peers(&self) -> Vec<String> {
        let topology = self.topology.read().unwrap_or_else(PoisonError::into_inner);
        topology.ring.nodes()
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }
}

impl PeerPicker for PeerRegistry {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let topology = self.topology.read().unwrap_or_else(PoisonError::into_inner);
        let peer = topology.ring.get(key)?;
        if peer == self.self_addr {
            return None;
        }
        tracing::info!("[Server {}] Pick peer {}", self.self_addr, peer);
        topology.getters.get(peer).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(String);

    #[async_trait]
    impl PeerGetter for Named {
        async fn fetch(&self, _req: &FetchRequest) -> Result<FetchResponse> {
            Ok(FetchResponse {
                value: self.0.as_bytes().to_vec(),
            })
        }
    }

    fn decimal_hash(data: &[u8]) -> u32 {
        std::str::from_utf8(data).unwrap().parse().unwrap()
    }

    fn peer(addr: &str) -> (String, Arc<dyn PeerGetter>) {
        (addr.to_string(), Arc::new(Named(addr.to_string())))
    }

    #[test]
    fn test_empty_registry_picks_nothing() {
        let registry = PeerRegistry::new("http://localhost:8001", 50);
        assert!(registry.pick_peer("Tom").is_none());
        assert!(registry.owner("Tom").is_none());
    }

    #[tokio::test]
    async fn test_pick_remote_peer() {
        // Points: "2" -> 2, 12; "4" -> 4, 14
        let registry = PeerRegistry::with_hash("2", 2, Some(decimal_hash));
        registry.set([peer("2"), peer("4")]);

        let getter = registry.pick_peer("3").expect("key 3 belongs to node 4");
        let resp = getter
            .fetch(&FetchRequest {
                group: "g".into(),
                key: "3".into(),
            })
            .await
            .unwrap();
        assert_eq!(resp.value, b"4");
    }

    #[test]
    fn test_self_is_never_picked() {
        let registry = PeerRegistry::with_hash("2", 2, Some(decimal_hash));
        registry.set([peer("2"), peer("4")]);

        assert_eq!(registry.owner("11").as_deref(), Some("2"));
        assert!(registry.pick_peer("11").is_none());
    }

    #[test]
    fn test_set_replaces_topology() {
        let registry = PeerRegistry::new("http://a", 10);
        registry.set([peer("http://a"), peer("http://b")]);
        assert_eq!(registry.peers(), vec!["http://a", "http://b"]);

        registry.set([peer("http://c")]);
        assert_eq!(registry.peers(), vec!["http://c"]);
        assert_eq!(registry.owner("anything").as_deref(), Some("http://c"));
    }
}
