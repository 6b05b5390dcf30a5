//! Directory of groups by name
//!
//! Built once at startup and shared (behind an `Arc`) with whatever serves
//! lookups. Creating a group with an existing name replaces the old one.

use crate::group::group::{Group, Loader};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group and register it under `name`
    pub fn create_group(
        &self,
        name: &str,
        cache_bytes: usize,
        loader: Arc<dyn Loader>,
    ) -> Arc<Group> {
        let group = Arc::new(Group::new(name, cache_bytes, loader));
        let previous = self
            .groups
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), group.clone());
        if previous.is_some() {
            tracing::warn!("Group {} replaced", name);
        }
        group
    }

    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered group names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn groups(&self) -> Vec<Arc<Group>> {
        let mut groups: Vec<Arc<Group>> = self
            .groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.name().cmp(b.name()));
        groups
    }
}
