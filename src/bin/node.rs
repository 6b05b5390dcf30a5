//! Cache node binary

use clap::{Parser, Subcommand};
use ringcache::{CacheServer, Config, Error, GroupRegistry, LoaderFn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ringcache-node")]
#[command(about = "ringcache distributed cache node")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a cache node
    Serve {
        /// Config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// This node's base URL, as listed in --peers
        #[arg(long)]
        addr: Option<String>,

        /// Socket address to bind (derived from --addr by default)
        #[arg(long)]
        bind: Option<String>,

        /// Peer base URLs (comma-separated)
        #[arg(long, value_delimiter = ',')]
        peers: Vec<String>,

        /// Virtual points per node on the hash ring
        #[arg(long)]
        replicas: Option<usize>,

        /// Byte budget of the local cache
        #[arg(long)]
        cache_bytes: Option<usize>,

        /// Bind address of the front-end API
        #[arg(long)]
        api: Option<String>,
    },
}

/// Stand-in for a slow backing database
fn slow_db() -> HashMap<&'static str, &'static str> {
    HashMap::from([("Tom", "630"), ("Jack", "589"), ("solu", "567")])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            addr,
            bind,
            peers,
            replicas,
            cache_bytes,
            api,
        } => {
            // Load config from file and environment, then override with CLI arguments
            let mut config = Config::load(config.as_deref())?;
            if let Some(addr) = addr {
                config.addr = addr;
            }
            if bind.is_some() {
                config.bind = bind;
            }
            if !peers.is_empty() {
                config.peers = peers;
            }
            if let Some(replicas) = replicas {
                config.replicas = replicas;
            }
            if let Some(cache_bytes) = cache_bytes {
                config.cache_bytes = cache_bytes;
            }
            if api.is_some() {
                config.api_addr = api;
            }

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            let db = slow_db();
            let groups = Arc::new(GroupRegistry::new());
            groups.create_group(
                &config.group,
                config.cache_bytes,
                Arc::new(LoaderFn(move |key: &str| -> ringcache::Result<Vec<u8>> {
                    tracing::info!("[SlowDB] search key {}", key);
                    db.get(key)
                        .map(|v| v.as_bytes().to_vec())
                        .ok_or_else(|| Error::NotFound(key.to_string()))
                })),
            );

            CacheServer::new(config, groups)?.serve().await?;
        }
    }

    Ok(())
}
