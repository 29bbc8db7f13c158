use std::collections::HashMap;

use crate::errors::{Result, TreeError};
use crate::node::{
    supports_field, supports_slot, ChildSlot, Field, FieldValue, Node, NodeId, NodeKind,
};

/// Arena of metadata nodes
///
/// Single-threaded, single-document. Nodes are created detached; callers
/// attach them to a parent child list. Deleting a subtree removes the root
/// and every node reachable through owned child lists.
#[derive(Debug, Clone, Default)]
pub struct MetadataTree {
    nodes: HashMap<NodeId, Node>,
}

impl MetadataTree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Construct a detached node of the given kind
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::fresh();
        self.nodes.insert(id, Node::new(id, kind));
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&id)
            .ok_or(TreeError::NodeNotFound { node_id: id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or(TreeError::NodeNotFound { node_id: id })
    }

    /// Check whether a node is live
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Declared kind of a node
    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        Ok(self.node(id)?.kind)
    }

    /// Read a field; `None` when unset
    ///
    /// # Errors
    /// `NodeNotFound` if the node is not live, `UnsupportedField` if the
    /// node kind does not define the field.
    pub fn field(&self, id: NodeId, field: Field) -> Result<Option<FieldValue>> {
        let node = self.node(id)?;
        if !supports_field(node.kind, field) {
            return Err(TreeError::UnsupportedField {
                kind: node.kind,
                field,
            });
        }
        Ok(node.fields.get(&field).cloned())
    }

    /// Write a field
    ///
    /// # Errors
    /// `NodeNotFound` if the node is not live, `UnsupportedField` if the
    /// node kind does not define the field.
    pub fn set_field(&mut self, id: NodeId, field: Field, value: FieldValue) -> Result<()> {
        let node = self.node_mut(id)?;
        if !supports_field(node.kind, field) {
            return Err(TreeError::UnsupportedField {
                kind: node.kind,
                field,
            });
        }
        node.fields.insert(field, value);
        Ok(())
    }

    /// Clear a field back to unset
    pub fn unset_field(&mut self, id: NodeId, field: Field) -> Result<()> {
        let node = self.node_mut(id)?;
        if !supports_field(node.kind, field) {
            return Err(TreeError::UnsupportedField {
                kind: node.kind,
                field,
            });
        }
        node.fields.remove(&field);
        Ok(())
    }

    /// Members of a child slot, in order
    pub fn children(&self, parent: NodeId, slot: ChildSlot) -> Result<Vec<NodeId>> {
        let node = self.node(parent)?;
        if !supports_slot(node.kind, slot) {
            return Err(TreeError::UnsupportedSlot {
                kind: node.kind,
                slot,
            });
        }
        Ok(node.children.get(&slot).cloned().unwrap_or_default())
    }

    /// Insert a child into a slot; `index = None` appends
    ///
    /// # Errors
    /// `UnsupportedSlot` if the parent kind lacks the slot,
    /// `IndexOutOfBounds` if the index is past the end of the list.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        slot: ChildSlot,
        child: NodeId,
        index: Option<usize>,
    ) -> Result<()> {
        self.node(child)?;
        let kind = self.node(parent)?.kind;
        if !supports_slot(kind, slot) {
            return Err(TreeError::UnsupportedSlot { kind, slot });
        }
        let list = self.node_mut(parent)?.children.entry(slot).or_default();
        let len = list.len();
        match index {
            Some(i) if i > len => Err(TreeError::IndexOutOfBounds {
                slot,
                index: i,
                len,
            }),
            Some(i) => {
                list.insert(i, child);
                Ok(())
            }
            None => {
                list.push(child);
                Ok(())
            }
        }
    }

    /// Remove a child from a slot, returning the index it occupied
    pub fn remove_child(&mut self, parent: NodeId, slot: ChildSlot, child: NodeId) -> Result<usize> {
        let kind = self.node(parent)?.kind;
        if !supports_slot(kind, slot) {
            return Err(TreeError::UnsupportedSlot { kind, slot });
        }
        let list = self.node_mut(parent)?.children.entry(slot).or_default();
        match list.iter().position(|c| *c == child) {
            Some(i) => {
                list.remove(i);
                Ok(i)
            }
            None => Err(TreeError::NotAChild {
                parent,
                child,
                slot,
            }),
        }
    }

    /// Nodes of a subtree in deterministic pre-order
    ///
    /// Order: the root first, then for each child slot in slot order, each
    /// child's subtree in list order. Restoring a snapshot of the subtree
    /// reproduces this order exactly, which consumers rely on to pair old
    /// and new identities.
    pub fn subtree(&self, root: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        self.collect_subtree(root, &mut out)?;
        Ok(out)
    }

    fn collect_subtree(&self, id: NodeId, out: &mut Vec<NodeId>) -> Result<()> {
        let node = self.node(id)?;
        out.push(id);
        for list in node.children.values() {
            for child in list.clone() {
                self.collect_subtree(child, out)?;
            }
        }
        Ok(())
    }

    /// Delete a node and every owned descendant
    pub fn delete_subtree(&mut self, root: NodeId) -> Result<()> {
        for id in self.subtree(root)? {
            self.nodes.remove(&id);
        }
        Ok(())
    }

    /// Point every reference field at `new` instead of `old`
    ///
    /// Used after a snapshot restore replaced a node's identity: references
    /// from elsewhere in the tree still carry the old identity and would
    /// otherwise dangle.
    pub fn rebind_references(&mut self, old: NodeId, new: NodeId) {
        for node in self.nodes.values_mut() {
            for value in node.fields.values_mut() {
                if let FieldValue::Reference(r) = value {
                    if *r == old {
                        *value = FieldValue::Reference(new);
                    }
                }
            }
        }
    }

    /// Reference fields held anywhere in a subtree, as
    /// (holder, field, target) triples in subtree walk order
    pub fn reference_fields(&self, root: NodeId) -> Result<Vec<(NodeId, Field, NodeId)>> {
        let mut out = Vec::new();
        for id in self.subtree(root)? {
            let node = self.node(id)?;
            for (field, value) in &node.fields {
                if let FieldValue::Reference(target) = value {
                    out.push((id, *field, *target));
                }
            }
        }
        Ok(out)
    }

    /// All live nodes of a kind (arbitrary order)
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.kind == kind)
            .map(|n| n.id)
            .collect()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn node_ref(&self, id: NodeId) -> Result<&Node> {
        self.node(id)
    }

    pub(crate) fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_fields() {
        let mut tree = MetadataTree::new();
        let p = tree.create_node(NodeKind::Partition);

        tree.set_field(p, Field::Name, FieldValue::Text("Partition 1".into()))
            .unwrap();
        assert_eq!(
            tree.field(p, Field::Name).unwrap(),
            Some(FieldValue::Text("Partition 1".into()))
        );
        assert_eq!(tree.field(p, Field::Query).unwrap(), None);
    }

    #[test]
    fn test_unsupported_field_rejected() {
        let mut tree = MetadataTree::new();
        let p = tree.create_node(NodeKind::Partition);

        let err = tree
            .set_field(p, Field::Expression, FieldValue::Text("1+1".into()))
            .unwrap_err();
        assert!(matches!(err, TreeError::UnsupportedField { .. }));
    }

    #[test]
    fn test_child_list_ordering() {
        let mut tree = MetadataTree::new();
        let table = tree.create_node(NodeKind::Table);
        let a = tree.create_node(NodeKind::Partition);
        let b = tree.create_node(NodeKind::Partition);
        let c = tree.create_node(NodeKind::Partition);

        tree.add_child(table, ChildSlot::Partitions, a, None).unwrap();
        tree.add_child(table, ChildSlot::Partitions, b, None).unwrap();
        tree.add_child(table, ChildSlot::Partitions, c, Some(1)).unwrap();
        assert_eq!(tree.children(table, ChildSlot::Partitions).unwrap(), vec![a, c, b]);

        let idx = tree.remove_child(table, ChildSlot::Partitions, c).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(tree.children(table, ChildSlot::Partitions).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_remove_child_not_a_member() {
        let mut tree = MetadataTree::new();
        let table = tree.create_node(NodeKind::Table);
        let stray = tree.create_node(NodeKind::Partition);

        let err = tree
            .remove_child(table, ChildSlot::Partitions, stray)
            .unwrap_err();
        assert!(matches!(err, TreeError::NotAChild { .. }));
    }

    #[test]
    fn test_delete_subtree_removes_owned_descendants() {
        let mut tree = MetadataTree::new();
        let p = tree.create_node(NodeKind::Partition);
        let cov = tree.create_node(NodeKind::CoverageDefinition);
        tree.add_child(p, ChildSlot::Coverage, cov, None).unwrap();

        tree.delete_subtree(p).unwrap();
        assert!(!tree.contains(p));
        assert!(!tree.contains(cov));
    }

    #[test]
    fn test_reference_fields_listed_per_holder() {
        let mut tree = MetadataTree::new();
        let ds = tree.create_node(NodeKind::DataSource);
        let p = tree.create_node(NodeKind::Partition);
        tree.set_field(p, Field::DataSource, FieldValue::Reference(ds))
            .unwrap();

        assert_eq!(
            tree.reference_fields(p).unwrap(),
            vec![(p, Field::DataSource, ds)]
        );
        assert!(tree.reference_fields(ds).unwrap().is_empty());
    }

    #[test]
    fn test_subtree_preorder() {
        let mut tree = MetadataTree::new();
        let table = tree.create_node(NodeKind::Table);
        let p1 = tree.create_node(NodeKind::Partition);
        let p2 = tree.create_node(NodeKind::Partition);
        let cov = tree.create_node(NodeKind::CoverageDefinition);
        tree.add_child(table, ChildSlot::Partitions, p1, None).unwrap();
        tree.add_child(table, ChildSlot::Partitions, p2, None).unwrap();
        tree.add_child(p1, ChildSlot::Coverage, cov, None).unwrap();

        assert_eq!(tree.subtree(table).unwrap(), vec![table, p1, cov, p2]);
    }
}
