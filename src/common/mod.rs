//! Common utilities and types shared across ringcache

pub mod config;
pub mod error;
pub mod hash;
pub mod metrics;
pub mod tracing_middleware;
pub mod utils;

pub use config::{Config, DEFAULT_BASE_PATH};
pub use error::{Error, Result};
pub use hash::{crc32_ieee, HashFn, HashRing, DEFAULT_REPLICAS};
pub use metrics::{CacheStats, Counter, GroupReport, GroupStats, GroupStatsSnapshot};
pub use utils::{decode_segment, encode_segment, format_bytes, normalize_base_path};
