//! HTTP transport between cache nodes
//!
//! - [`HttpGetter`]: fetches one key from one peer
//! - [`HttpPool`]: peer picker backed by a getter per peer
//! - [`create_peer_router`]: serves this node's groups to its peers
//! - [`CacheServer`]: wires the above together for a node process

pub mod client;
pub mod http;
pub mod pool;
pub mod server;

pub use client::HttpGetter;
pub use http::{create_api_router, create_peer_router, PeerState};
pub use pool::HttpPool;
pub use server::CacheServer;
