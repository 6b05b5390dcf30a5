//! Request coalescing
//!
//! Concurrent loads of the same key collapse into one execution. The first
//! caller starts the load on its own task; it and every caller arriving while
//! the load is in flight wait on a `watch` slot and receive a clone of the
//! outcome. A caller that stops waiting does not cancel the load. The record
//! is removed as soon as the load finishes, so nothing is cached here.

use crate::{Error, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

type Slot<T> = Option<Result<T>>;
type Calls<T> = Arc<Mutex<HashMap<String, Call<T>>>>;

struct Call<T> {
    rx: watch::Receiver<Slot<T>>,
    waiters: usize,
}

/// Deduplicates concurrent loads per key
pub struct Coalescer<T> {
    calls: Calls<T>,
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `load` for `key` unless a load for the same key is already in
    /// flight, in which case wait for that one and share its result.
    ///
    /// The load runs on a spawned task: dropping the returned future stops
    /// waiting but lets the load finish for everyone else.
    pub async fn run<F, Fut>(&self, key: &str, load: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (mut rx, leader) = {
            let mut calls = lock(&self.calls);
            match calls.get_mut(key) {
                Some(call) => {
                    call.waiters += 1;
                    (call.rx.clone(), None)
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    calls.insert(
                        key.to_string(),
                        Call {
                            rx: rx.clone(),
                            waiters: 0,
                        },
                    );
                    (rx, Some(tx))
                }
            }
        };

        if let Some(tx) = leader {
            let mut flight = Flight {
                calls: self.calls.clone(),
                key: key.to_string(),
                done: false,
            };
            let fut = load();
            tokio::spawn(async move {
                let result = fut.await;
                // Record is gone before the result is published; later callers load afresh
                let waiters = flight.finish();
                if waiters > 0 {
                    tracing::debug!("Shared load of {} with {} waiter(s)", flight.key, waiters);
                }
                let _ = tx.send(Some(result));
            });
        }

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        // The sender only goes away unpublished if the load task panicked
        outcome.unwrap_or_else(|| Err(Error::Loader(format!("load of {} panicked", key))))
    }

    /// Number of keys with a load in flight
    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Callers waiting on the load of `key`, besides the one that started it
    pub fn waiters(&self, key: &str) -> usize {
        lock(&self.calls).get(key).map_or(0, |c| c.waiters)
    }
}

impl<T> Default for Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(calls: &Mutex<HashMap<String, Call<T>>>) -> MutexGuard<'_, HashMap<String, Call<T>>> {
    calls.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the in-flight record when the load task finishes, or unwinds.
struct Flight<T> {
    calls: Calls<T>,
    key: String,
    done: bool,
}

impl<T> Flight<T> {
    fn remove(&self) -> usize {
        lock(&self.calls).remove(&self.key).map_or(0, |c| c.waiters)
    }

    fn finish(&mut self) -> usize {
        self.done = true;
        self.remove()
    }
}

impl<T> Drop for Flight<T> {
    fn drop(&mut self) {
        if !self.done {
            self.remove();
        }
    }
}
