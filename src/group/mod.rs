//! Cache coordination
//!
//! - [`Group`]: named namespace tying the local cache, peers and loader together
//! - [`GroupRegistry`]: groups by name
//! - [`Coalescer`]: one load per key at a time
//! - [`PeerRegistry`]: consistent-hash peer picker

#[allow(clippy::module_inception)]
pub mod group;
pub mod peers;
pub mod registry;
pub mod singleflight;

pub use group::{Group, Loader, LoaderFn};
pub use peers::{FetchRequest, FetchResponse, PeerGetter, PeerPicker, PeerRegistry};
pub use registry::GroupRegistry;
pub use singleflight::Coalescer;
