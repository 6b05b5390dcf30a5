//! # ringcache
//!
//! A distributed read-through cache library:
//! - Named groups, each with a byte-bounded LRU cache and a loader for misses
//! - Consistent hashing to pick the peer that owns a key
//! - Concurrent misses for one key coalesced into a single load
//! - HTTP peer protocol for fetching from the owning node
//!
//! ## Architecture

#![allow(clippy::result_large_err)]
//!
//! ```text
//!   Group::get(key)
//!        │
//!        ▼
//!  ┌─────────────┐ hit
//!  │ local cache ├──────────────► value
//!  └──────┬──────┘
//!         │ miss
//!         ▼
//!  ┌─────────────┐   remote owner   ┌────────────────────┐
//!  │  coalescer  ├─────────────────►│ peer (HTTP GET     │
//!  │ (per key)   │                  │ /_ringcache/g/key) │
//!  └──────┬──────┘                  └────────────────────┘
//!         │ self owns / peer failed
//!         ▼
//!  ┌─────────────┐
//!  │   loader    ├──► populate local cache ──► value
//!  └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start a node
//! ```bash
//! ringcache-node serve \
//!   --addr http://localhost:8001 \
//!   --peers http://localhost:8001,http://localhost:8002,http://localhost:8003 \
//!   --api 127.0.0.1:9999
//! ```
//!
//! ### Query
//! ```bash
//! curl "http://127.0.0.1:9999/api?key=Tom"
//! curl "http://localhost:8002/_ringcache/scores/Tom"
//! ```
//!
//! ### Embed
//! ```no_run
//! use ringcache::{GroupRegistry, LoaderFn};
//! use std::sync::Arc;
//!
//! # async fn demo() -> ringcache::Result<()> {
//! let groups = GroupRegistry::new();
//! let scores = groups.create_group(
//!     "scores",
//!     2 << 10,
//!     Arc::new(LoaderFn(|key: &str| -> ringcache::Result<Vec<u8>> {
//!         Ok(key.as_bytes().to_vec())
//!     })),
//! );
//! let value = scores.get("Tom").await?;
//! assert_eq!(value.to_string(), "Tom");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod common;
pub mod group;
pub mod transport;

// Re-export commonly used types
pub use cache::ByteView;
pub use common::{Config, Error, Result};
pub use group::{Group, GroupRegistry, Loader, LoaderFn, PeerGetter, PeerPicker, PeerRegistry};
pub use transport::{CacheServer, HttpPool};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
