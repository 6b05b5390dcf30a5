//! Local storage for cached values
//!
//! - [`ByteView`]: immutable value bytes
//! - [`LruCache`]: single-threaded byte-bounded LRU store
//! - [`Cache`]: the store behind a mutex, created on first insert

pub mod byteview;
pub mod lru;

pub use byteview::ByteView;
pub use lru::{CacheValue, EvictionCallback, LruCache};

use crate::common::metrics::{CacheStats, Counter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Thread-safe wrapper around a lazily created [`LruCache`].
///
/// The lock covers the whole store call, cascading evictions included, and
/// is never held across an `.await`.
pub struct Cache {
    cache_bytes: usize,
    lru: Mutex<Option<LruCache<ByteView>>>,
    gets: Counter,
    hits: Counter,
    evictions: Arc<AtomicU64>,
}

impl Cache {
    pub fn new(cache_bytes: usize) -> Self {
        Self {
            cache_bytes,
            lru: Mutex::new(None),
            gets: Counter::new(),
            hits: Counter::new(),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn get(&self, key: &str) -> Option<ByteView> {
        self.gets.inc();
        let mut guard = self.lock();
        let value = guard.as_mut()?.get(key).cloned();
        if value.is_some() {
            self.hits.inc();
        }
        value
    }

    pub fn add(&self, key: &str, value: ByteView) {
        let mut guard = self.lock();
        let evictions = self.evictions.clone();
        guard
            .get_or_insert_with(|| {
                LruCache::new(
                    self.cache_bytes,
                    Some(Box::new(move |_key: String, _value: ByteView| {
                        evictions.fetch_add(1, Ordering::Relaxed);
                    })),
                )
            })
            .add(key, value);
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.lock().as_ref().map_or(0, |lru| lru.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes used by cached keys and values
    pub fn bytes(&self) -> usize {
        self.lock().as_ref().map_or(0, |lru| lru.bytes())
    }

    /// Whether the underlying store has been allocated yet
    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    pub fn capacity(&self) -> usize {
        self.cache_bytes
    }

    pub fn stats(&self) -> CacheStats {
        let (items, bytes) = {
            let guard = self.lock();
            guard
                .as_ref()
                .map_or((0, 0), |lru| (lru.len() as u64, lru.bytes() as u64))
        };
        CacheStats {
            items,
            bytes,
            gets: self.gets.get(),
            hits: self.hits.get(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<LruCache<ByteView>>> {
        // Every mutation leaves the store consistent, so a poisoned lock is
        // still safe to use.
        self.lru.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
