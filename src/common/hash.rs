//! Consistent hashing for peer selection
//!
//! Every node is projected onto a 32-bit ring as `replicas` virtual points.
//! A key belongs to the first point clockwise from its own hash.

use std::collections::HashMap;

/// Hash function used to place nodes and keys on the ring
pub type HashFn = fn(&[u8]) -> u32;

/// Default virtual points per node
pub const DEFAULT_REPLICAS: usize = 50;

/// IEEE CRC-32, the default ring hash
pub fn crc32_ieee(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Consistent hash ring with virtual replicas.
///
/// Not internally synchronized. Owners rebuild it wholesale behind their
/// own lock when the node set changes.
#[derive(Debug, Clone)]
pub struct HashRing {
    hash_fn: HashFn,
    replicas: usize,
    /// Sorted ring points
    points: Vec<u32>,
    /// Ring point -> node
    owners: HashMap<u32, String>,
}

impl HashRing {
    pub fn new(replicas: usize, hash_fn: Option<HashFn>) -> Self {
        Self {
            hash_fn: hash_fn.unwrap_or(crc32_ieee),
            replicas,
            points: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Place nodes on the ring.
    ///
    /// A node that is already present has its old points replaced. Hash
    /// collisions between nodes overwrite the owner; the last node added wins.
    pub fn add<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for node in nodes {
            let node = node.into();
            if self.contains(&node) {
                self.remove_points(&node);
            }
            for i in 0..self.replicas {
                let hash = (self.hash_fn)(format!("{}{}", i, node).as_bytes());
                self.points.push(hash);
                self.owners.insert(hash, node.clone());
            }
        }
        self.points.sort_unstable();
    }

    /// Node owning `key`, or `None` on an empty ring
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.points.is_empty() {
            return None;
        }

        let hash = (self.hash_fn)(key.as_bytes());
        let idx = self.points.partition_point(|&p| p < hash);
        let point = self.points[idx % self.points.len()];

        self.owners.get(&point).map(String::as_str)
    }

    /// Number of points on the ring
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distinct nodes currently on the ring, sorted
    pub fn nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = self.owners.values().cloned().collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }

    fn contains(&self, node: &str) -> bool {
        self.owners.values().any(|n| n == node)
    }

    fn remove_points(&mut self, node: &str) {
        let stale: Vec<u32> = self
            .owners
            .iter()
            .filter(|(_, owner)| owner.as_str() == node)
            .map(|(hash, _)| *hash)
            .collect();

        for hash in &stale {
            self.owners.remove(hash);
        }

        let mut budget = self.replicas;
        self.points.retain(|p| {
            if budget > 0 && stale.contains(p) {
                budget -= 1;
                false
            } else {
                true
            }
        });
    }
}
