//! Named cache namespace
//!
//! A lookup probes the local cache, and on a miss goes through the coalescer
//! to either the owning peer or the group's loader. Values fetched from a
//! peer are returned without being cached here: each node only caches the
//! keys it owns on the ring.

use crate::cache::{ByteView, Cache};
use crate::common::metrics::{GroupReport, GroupStats};
use crate::group::peers::{FetchRequest, PeerGetter, PeerPicker};
use crate::group::singleflight::Coalescer;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};

/// Loads a value from the backing data source on a cache miss
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> Result<Vec<u8>>;
}

/// Adapts a plain function into a [`Loader`]
pub struct LoaderFn<F>(pub F);

#[async_trait]
impl<F> Loader for LoaderFn<F>
where
    F: Fn(&str) -> Result<Vec<u8>> + Send + Sync,
{
    async fn load(&self, key: &str) -> Result<Vec<u8>> {
        (self.0)(key)
    }
}

pub struct Group {
    name: String,
    loader: Arc<dyn Loader>,
    main_cache: Arc<Cache>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    flight: Coalescer<ByteView>,
    stats: Arc<GroupStats>,
}

impl Group {
    pub fn new(name: impl Into<String>, cache_bytes: usize, loader: Arc<dyn Loader>) -> Self {
        Self {
            name: name.into(),
            loader,
            main_cache: Arc::new(Cache::new(cache_bytes)),
            peers: OnceLock::new(),
            flight: Coalescer::new(),
            stats: Arc::new(GroupStats::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Install the peer picker. Topology is fixed before traffic starts, so
    /// a second registration is a configuration error.
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) -> Result<()> {
        self.peers
            .set(peers)
            .map_err(|_| Error::PeersAlreadyRegistered(self.name.clone()))
    }

    pub fn has_peers(&self) -> bool {
        self.peers.get().is_some()
    }

    pub async fn get(&self, key: &str) -> Result<ByteView> {
        self.stats.gets.inc();
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        if let Some(v) = self.main_cache.get(key) {
            tracing::debug!("[{}] cache hit: {}", self.name, key);
            self.stats.cache_hits.inc();
            return Ok(v);
        }

        self.load(key).await
    }

    /// Probe the local cache only, with no peer or loader fallback
    pub fn get_cached(&self, key: &str) -> Option<ByteView> {
        self.main_cache.get(key)
    }

    /// Record a lookup that arrived from another peer
    pub fn record_server_request(&self) {
        self.stats.server_requests.inc();
    }

    pub fn report(&self) -> GroupReport {
        GroupReport {
            name: self.name.clone(),
            stats: self.stats.snapshot(),
            cache: self.main_cache.stats(),
        }
    }

    async fn load(&self, key: &str) -> Result<ByteView> {
        self.stats.loads.inc();
        let fill = Fill {
            group: self.name.clone(),
            key: key.to_string(),
            loader: self.loader.clone(),
            peers: self.peers.get().cloned(),
            cache: self.main_cache.clone(),
            stats: self.stats.clone(),
        };
        self.flight.run(key, move || fill.run()).await
    }
}

/// One coalesced miss. Owns everything it touches so it can outlive the
/// caller that started it.
struct Fill {
    group: String,
    key: String,
    loader: Arc<dyn Loader>,
    peers: Option<Arc<dyn PeerPicker>>,
    cache: Arc<Cache>,
    stats: Arc<GroupStats>,
}

impl Fill {
    async fn run(self) -> Result<ByteView> {
        self.stats.loads_deduped.inc();

        if let Some(peer) = self.peers.as_ref().and_then(|p| p.pick_peer(&self.key)) {
            match self.get_from_peer(peer.as_ref()).await {
                Ok(value) => {
                    self.stats.peer_loads.inc();
                    return Ok(value);
                }
                Err(e) => {
                    self.stats.peer_errors.inc();
                    tracing::warn!("[{}] Failed to get {} from peer: {}", self.group, self.key, e);
                }
            }
        }

        self.get_locally().await
    }

    async fn get_from_peer(&self, peer: &dyn PeerGetter) -> Result<ByteView> {
        let req = FetchRequest {
            group: self.group.clone(),
            key: self.key.clone(),
        };
        let res = peer.fetch(&req).await?;
        Ok(ByteView::from(res.value))
    }

    async fn get_locally(&self) -> Result<ByteView> {
        let bytes = match self.loader.load(&self.key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.stats.local_load_errs.inc();
                return Err(e);
            }
        };
        self.stats.local_loads.inc();

        let value = ByteView::new(&bytes);
        self.populate_cache(value.clone());
        Ok(value)
    }

    fn populate_cache(&self, value: ByteView) {
        self.cache.add(&self.key, value);
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache_bytes", &self.main_cache.capacity())
            .field("has_peers", &self.has_peers())
            .finish()
    }
}
