//! Cache statistics and Prometheus rendering
//!
//! Counters are plain relaxed atomics; a snapshot is not a consistent cut
//! across counters, which is fine for monitoring.

use serde::Serialize;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Per-group lookup counters
#[derive(Debug, Default)]
pub struct GroupStats {
    /// Every `get`, including ones rejected by validation
    pub gets: Counter,
    pub cache_hits: Counter,
    /// Values served by a remote peer
    pub peer_loads: Counter,
    pub peer_errors: Counter,
    /// Misses that entered the coalescer
    pub loads: Counter,
    /// Loads actually executed (after coalescing)
    pub loads_deduped: Counter,
    pub local_loads: Counter,
    pub local_load_errs: Counter,
    /// Lookups that arrived from other peers
    pub server_requests: Counter,
}

impl GroupStats {
    pub fn snapshot(&self) -> GroupStatsSnapshot {
        GroupStatsSnapshot {
            gets: self.gets.get(),
            cache_hits: self.cache_hits.get(),
            peer_loads: self.peer_loads.get(),
            peer_errors: self.peer_errors.get(),
            loads: self.loads.get(),
            loads_deduped: self.loads_deduped.get(),
            local_loads: self.local_loads.get(),
            local_load_errs: self.local_load_errs.get(),
            server_requests: self.server_requests.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupStatsSnapshot {
    pub gets: u64,
    pub cache_hits: u64,
    pub peer_loads: u64,
    pub peer_errors: u64,
    pub loads: u64,
    pub loads_deduped: u64,
    pub local_loads: u64,
    pub local_load_errs: u64,
    pub server_requests: u64,
}

/// Point-in-time view of a local cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub items: u64,
    pub bytes: u64,
    pub gets: u64,
    pub hits: u64,
    pub evictions: u64,
}

/// Everything reported for one group
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub name: String,
    pub stats: GroupStatsSnapshot,
    pub cache: CacheStats,
}

/// Generate Prometheus-compatible metrics output
pub fn to_prometheus(reports: &[GroupReport]) -> String {
    let mut out = String::new();

    let group_metrics: [(&str, &str, fn(&GroupStatsSnapshot) -> u64); 9] = [
        ("gets_total", "Lookups received", |s| s.gets),
        ("cache_hits_total", "Lookups answered by the local cache", |s| s.cache_hits),
        ("peer_loads_total", "Values fetched from a remote peer", |s| s.peer_loads),
        ("peer_errors_total", "Failed remote peer fetches", |s| s.peer_errors),
        ("loads_total", "Cache misses entering the coalescer", |s| s.loads),
        ("loads_deduped_total", "Loads executed after coalescing", |s| s.loads_deduped),
        ("local_loads_total", "Successful local loads", |s| s.local_loads),
        ("local_load_errors_total", "Failed local loads", |s| s.local_load_errs),
        ("server_requests_total", "Lookups received from peers", |s| s.server_requests),
    ];

    for (name, help, value) in group_metrics {
        let _ = writeln!(out, "# HELP ringcache_{} {}", name, help);
        let _ = writeln!(out, "# TYPE ringcache_{} counter", name);
        for r in reports {
            let _ = writeln!(
                out,
                "ringcache_{}{{group=\"{}\"}} {}",
                name,
                escape_label(&r.name),
                value(&r.stats)
            );
        }
    }

    let cache_metrics: [(&str, &str, &str, fn(&CacheStats) -> u64); 5] = [
        ("cache_items", "gauge", "Entries in the local cache", |c| c.items),
        ("cache_bytes", "gauge", "Bytes held by the local cache", |c| c.bytes),
        ("local_cache_gets_total", "counter", "Local cache probes", |c| c.gets),
        ("local_cache_hits_total", "counter", "Local cache probe hits", |c| c.hits),
        ("cache_evictions_total", "counter", "Entries evicted from the local cache", |c| c.evictions),
    ];

    for (name, kind, help, value) in cache_metrics {
        let _ = writeln!(out, "# HELP ringcache_{} {}", name, help);
        let _ = writeln!(out, "# TYPE ringcache_{} {}", name, kind);
        for r in reports {
            let _ = writeln!(
                out,
                "ringcache_{}{{group=\"{}\"}} {}",
                name,
                escape_label(&r.name),
                value(&r.cache)
            );
        }
    }

    out
}

/// Escape a label value for the text exposition format
fn escape_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let c = Counter::new();
        c.inc();
        c.add(4);
        assert_eq!(c.get(), 5);
    }

    #[test]
    fn test_snapshot() {
        let stats = GroupStats::default();
        stats.gets.inc();
        stats.gets.inc();
        stats.cache_hits.inc();
        let snap = stats.snapshot();
        assert_eq!(snap.gets, 2);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.peer_loads, 0);
    }

    #[test]
    fn test_prometheus_output() {
        let report = GroupReport {
            name: "scores".into(),
            stats: GroupStatsSnapshot {
                gets: 3,
                cache_hits: 1,
                ..Default::default()
            },
            cache: CacheStats {
                items: 2,
                bytes: 14,
                ..Default::default()
            },
        };
        let out = to_prometheus(&[report]);
        assert!(out.contains("# TYPE ringcache_gets_total counter"));
        assert!(out.contains("ringcache_gets_total{group=\"scores\"} 3"));
        assert!(out.contains("ringcache_cache_hits_total{group=\"scores\"} 1"));
        assert!(out.contains("ringcache_cache_bytes{group=\"scores\"} 14"));
    }

    #[test]
    fn test_group_label_is_escaped() {
        let report = GroupReport {
            name: "a\"b\\c\nd".into(),
            stats: GroupStatsSnapshot::default(),
            cache: CacheStats::default(),
        };
        let out = to_prometheus(&[report]);
        assert!(out.contains(r#"ringcache_gets_total{group="a\"b\\c\nd"} 0"#));
        assert_eq!(out.lines().filter(|l| l.starts_with("ringcache_gets_total")).count(), 1);
    }
}
