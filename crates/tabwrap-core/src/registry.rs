//! Lookup registry: node identity to owning wrapper
//!
//! The single source of truth for "does a wrapper exist for this node".
//! Reference-valued property getters resolve through here rather than
//! holding wrapper-to-wrapper pointers, because node identity is the
//! durable handle that survives snapshot/restore cycles.

use std::collections::HashMap;

use tabwrap_tree::NodeId;

use crate::errors::{Result, TabwrapError};
use crate::model::ObjectId;

/// Bidirectional node-to-wrapper index (non-owning)
///
/// Exactly one wrapper per live node. Re-registering an already-registered
/// node signals a consistency violation rather than silently replacing the
/// mapping.
#[derive(Debug, Default)]
pub struct WrapperRegistry {
    by_node: HashMap<NodeId, ObjectId>,
}

impl WrapperRegistry {
    pub fn new() -> Self {
        Self {
            by_node: HashMap::new(),
        }
    }

    /// Register a wrapper as the owner of a node
    ///
    /// # Errors
    /// `ConsistencyViolation` if the node is already registered.
    pub fn register(&mut self, node: NodeId, wrapper: ObjectId) -> Result<()> {
        if let Some(existing) = self.by_node.get(&node) {
            return Err(TabwrapError::ConsistencyViolation {
                detail: format!(
                    "node {node} is already registered to wrapper {existing}; refusing to rebind to {wrapper}"
                ),
            });
        }
        self.by_node.insert(node, wrapper);
        Ok(())
    }

    /// The wrapper owning a node, if one is registered
    pub fn lookup(&self, node: NodeId) -> Option<ObjectId> {
        self.by_node.get(&node).copied()
    }

    /// Drop the mapping for a node, returning the wrapper it pointed at
    pub fn unregister(&mut self, node: NodeId) -> Option<ObjectId> {
        self.by_node.remove(&node)
    }

    /// Number of registered nodes
    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }

    /// Iterate all (node, wrapper) entries (arbitrary order)
    pub fn entries(&self) -> impl Iterator<Item = (NodeId, ObjectId)> + '_ {
        self.by_node.iter().map(|(n, w)| (*n, *w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabwrap_tree::{MetadataTree, NodeKind};

    #[test]
    fn test_register_lookup_unregister() {
        let mut tree = MetadataTree::new();
        let node = tree.create_node(NodeKind::Table);
        let wrapper = ObjectId::fresh();

        let mut reg = WrapperRegistry::new();
        reg.register(node, wrapper).unwrap();
        assert_eq!(reg.lookup(node), Some(wrapper));

        assert_eq!(reg.unregister(node), Some(wrapper));
        assert_eq!(reg.lookup(node), None);
    }

    #[test]
    fn test_double_registration_is_a_violation() {
        let mut tree = MetadataTree::new();
        let node = tree.create_node(NodeKind::Table);

        let mut reg = WrapperRegistry::new();
        reg.register(node, ObjectId::fresh()).unwrap();
        let err = reg.register(node, ObjectId::fresh()).unwrap_err();
        assert!(matches!(err, TabwrapError::ConsistencyViolation { .. }));
    }
}
