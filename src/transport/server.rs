//! Cache node server

use crate::common::{format_bytes, Config, Result};
use crate::group::{GroupRegistry, PeerPicker};
use crate::transport::http::{create_api_router, create_peer_router, PeerState};
use crate::transport::pool::HttpPool;
use crate::Error;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct CacheServer {
    config: Config,
    groups: Arc<GroupRegistry>,
    pool: Arc<HttpPool>,
}

impl CacheServer {
    /// Build the peer pool from `config` and register it with every group.
    ///
    /// Fails if a group already has peers: topology is fixed at startup.
    pub fn new(config: Config, groups: Arc<GroupRegistry>) -> Result<Self> {
        config.validate()?;

        let pool = Arc::new(HttpPool::from_config(&config)?);
        pool.set(config.peers.as_slice());

        for group in groups.groups() {
            let picker: Arc<dyn PeerPicker> = pool.clone();
            group.register_peers(picker)?;
        }

        Ok(Self {
            config,
            groups,
            pool,
        })
    }

    pub fn pool(&self) -> &Arc<HttpPool> {
        &self.pool
    }

    /// Bind the configured addresses and serve until shutdown
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        let api_listener = match &self.config.api_addr {
            Some(addr) => Some(TcpListener::bind(addr).await?),
            None => None,
        };
        self.run(listener, api_listener).await
    }

    /// Serve on already-bound listeners
    pub async fn run(self, listener: TcpListener, api_listener: Option<TcpListener>) -> Result<()> {
        tracing::info!(
            "Starting cache node: {} (ringcache {})",
            self.pool.self_addr(),
            crate::VERSION
        );
        tracing::info!("  Peer API: {}{}", listener.local_addr()?, self.pool.base_path());
        tracing::info!("  Peers: {:?}", self.pool.peers());
        tracing::info!("  Groups: {:?}", self.groups.names());
        tracing::info!("  Cache size: {}", format_bytes(self.config.cache_bytes as u64));

        let peer_router = create_peer_router(PeerState {
            groups: self.groups.clone(),
            node: self.pool.self_addr().to_string(),
            base_path: self.pool.base_path().to_string(),
        });
        let peer_server = axum::serve(listener, peer_router);

        let api_server = match api_listener {
            Some(api_listener) => {
                let group = self
                    .groups
                    .get_group(&self.config.group)
                    .ok_or_else(|| Error::GroupNotFound(self.config.group.clone()))?;
                tracing::info!("  Front-end API: {}/api", api_listener.local_addr()?);
                Some(axum::serve(api_listener, create_api_router(group)))
            }
            None => None,
        };

        tracing::info!("✓ Cache node ready");

        tokio::select! {
            res = peer_server => {
                if let Err(e) = res {
                    tracing::error!("Peer server error: {}", e);
                    return Err(e.into());
                }
            }
            res = async {
                match api_server {
                    Some(server) => server.await,
                    None => std::future::pending().await,
                }
            } => {
                if let Err(e) = res {
                    tracing::error!("API server error: {}", e);
                    return Err(e.into());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::LoaderFn;

    fn groups() -> Arc<GroupRegistry> {
        let groups = Arc::new(GroupRegistry::new());
        groups.create_group(
            "scores",
            2 << 10,
            Arc::new(LoaderFn(|_key: &str| -> Result<Vec<u8>> { Ok(b"1".to_vec()) })),
        );
        groups
    }

    #[test]
    fn test_new_registers_pool_with_groups() {
        let groups = groups();
        let config = Config {
            peers: vec!["http://localhost:8001".into(), "http://localhost:8002".into()],
            ..Default::default()
        };
        let server = CacheServer::new(config, groups.clone()).unwrap();
        assert!(groups.get_group("scores").unwrap().has_peers());
        assert_eq!(server.pool().peers().len(), 2);
    }

    #[test]
    fn test_second_server_on_same_groups_fails() {
        let groups = groups();
        CacheServer::new(Config::default(), groups.clone()).unwrap();
        let err = CacheServer::new(Config::default(), groups).err().unwrap();
        assert_eq!(err, Error::PeersAlreadyRegistered("scores".into()));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config {
            replicas: 0,
            ..Default::default()
        };
        assert!(matches!(
            CacheServer::new(config, groups()),
            Err(Error::InvalidConfig(_))
        ));
    }
}
