//! Session registry of live nodes.
//!
//! Entries are added when a node is mounted and removed when it is destroyed.
//! Queries iterate over a snapshot so callers may destroy nodes while walking
//! the result.

use std::collections::BTreeMap;

use crate::value::{ElementRef, NodeId};

/// What the registry knows about a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Host element.
    pub element: ElementRef,
    /// Route key the node belongs to.
    pub route: Option<String>,
}

/// Live nodes of one engine session.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<NodeId, RegistryEntry>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node.
    pub fn add(&mut self, node: NodeId, element: ElementRef, route: Option<String>) {
        self.entries.insert(node, RegistryEntry { element, route });
    }

    /// Unregister a node.
    pub fn remove(&mut self, node: NodeId) -> Option<RegistryEntry> {
        self.entries.remove(&node)
    }

    /// Whether a node is registered.
    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    /// Look up a node.
    pub fn get(&self, node: NodeId) -> Option<&RegistryEntry> {
        self.entries.get(&node)
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of all entries in id order.
    pub fn snapshot(&self) -> Vec<(NodeId, RegistryEntry)> {
        self.entries
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect()
    }

    /// Nodes registered under `route`, or every node when `route` is `None`.
    pub fn nodes_for_route(&self, route: Option<&str>) -> Vec<NodeId> {
        self.entries
            .iter()
            .filter(|(_, entry)| route.is_none() || entry.route.as_deref() == route)
            .map(|(id, _)| *id)
            .collect()
    }
}
