//! Read-through behavior of a group

use async_trait::async_trait;
use ringcache::group::{FetchRequest, FetchResponse};
use ringcache::{Error, GroupRegistry, LoaderFn, PeerGetter, PeerRegistry, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn db() -> HashMap<&'static str, &'static str> {
    HashMap::from([("Tom", "630"), ("Jack", "589"), ("solu", "567")])
}

/// Group over the test db that counts loader calls per key
fn counted_group(groups: &GroupRegistry) -> (Arc<ringcache::Group>, Arc<Mutex<HashMap<String, usize>>>) {
    let counts = Arc::new(Mutex::new(HashMap::new()));
    let seen = counts.clone();
    let db = db();
    let group = groups.create_group(
        "scores",
        2 << 10,
        Arc::new(LoaderFn(move |key: &str| -> Result<Vec<u8>> {
            *seen.lock().unwrap().entry(key.to_string()).or_insert(0) += 1;
            db.get(key)
                .map(|v| v.as_bytes().to_vec())
                .ok_or_else(|| Error::NotFound(key.to_string()))
        })),
    );
    (group, counts)
}

#[tokio::test]
async fn test_second_get_is_served_from_cache() {
    let groups = GroupRegistry::new();
    let (group, counts) = counted_group(&groups);

    for (k, v) in db() {
        assert_eq!(group.get(k).await.unwrap().to_string(), v);
        assert_eq!(group.get(k).await.unwrap().to_string(), v);
        assert_eq!(counts.lock().unwrap()[k], 1, "cache {} miss", k);
    }
}

#[tokio::test]
async fn test_errors_are_not_cached() {
    let groups = GroupRegistry::new();
    let (group, counts) = counted_group(&groups);

    assert_eq!(group.get("").await.unwrap_err(), Error::EmptyKey);
    assert!(counts.lock().unwrap().is_empty());

    let err = group.get("unknown").await.unwrap_err();
    assert_eq!(err, Error::NotFound("unknown".into()));
    assert_eq!(err.to_string(), "unknown not exist");
    assert!(group.get_cached("unknown").is_none());

    group.get("unknown").await.unwrap_err();
    assert_eq!(counts.lock().unwrap()["unknown"], 2);
}

#[tokio::test]
async fn test_returned_copy_does_not_alias_cache() {
    let groups = GroupRegistry::new();
    let (group, _) = counted_group(&groups);

    let mut copy = group.get("Tom").await.unwrap().to_vec();
    copy[0] = b'9';
    assert_eq!(group.get("Tom").await.unwrap().to_string(), "630");
}

struct FakePeer {
    fetches: AtomicUsize,
}

#[async_trait]
impl PeerGetter for FakePeer {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        assert_eq!(req.group, "scores");
        match req.key.as_str() {
            "x" => Ok(FetchResponse {
                value: b"42".to_vec(),
            }),
            _ => Err(Error::Peer("peer down".into())),
        }
    }
}

fn remote_only_group() -> (GroupRegistry, Arc<FakePeer>, Arc<AtomicUsize>) {
    let groups = GroupRegistry::new();
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let group = groups.create_group(
        "scores",
        2 << 10,
        Arc::new(LoaderFn(move |_key: &str| -> Result<Vec<u8>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(b"local".to_vec())
        })),
    );

    // This node is not on the ring, so every key is owned by the fake peer
    let peer = Arc::new(FakePeer {
        fetches: AtomicUsize::new(0),
    });
    let registry = PeerRegistry::new("http://self", 50);
    let getter: Arc<dyn PeerGetter> = peer.clone();
    registry.set([("http://peer".to_string(), getter)]);
    group.register_peers(Arc::new(registry)).unwrap();

    (groups, peer, loads)
}

#[tokio::test]
async fn test_remote_value_is_not_cached_locally() {
    let (groups, peer, loads) = remote_only_group();
    let group = groups.get_group("scores").unwrap();

    assert_eq!(group.get("x").await.unwrap().to_string(), "42");
    assert!(group.get_cached("x").is_none());
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    // Not cached, so the peer is asked again
    group.get("x").await.unwrap();
    assert_eq!(peer.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_peer_failure_falls_back_to_loader() {
    let (groups, peer, loads) = remote_only_group();
    let group = groups.get_group("scores").unwrap();

    assert_eq!(group.get("y").await.unwrap().to_string(), "local");
    assert_eq!(peer.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(group.get_cached("y").is_some());

    let report = group.report();
    assert_eq!(report.stats.peer_errors, 1);
    assert_eq!(report.stats.local_loads, 1);
}

#[tokio::test]
async fn test_lru_budget_applies_to_group() {
    let groups = GroupRegistry::new();
    let group = groups.create_group(
        "tiny",
        8,
        Arc::new(LoaderFn(|key: &str| -> Result<Vec<u8>> {
            Ok(key.as_bytes().to_vec())
        })),
    );

    // Each entry costs len(key) + len(value) = 4 bytes
    for key in ["aa", "bb", "cc"] {
        group.get(key).await.unwrap();
    }
    assert!(group.get_cached("aa").is_none());
    assert!(group.get_cached("bb").is_some());
    assert!(group.get_cached("cc").is_some());
    assert_eq!(group.report().cache.evictions, 1);
}
