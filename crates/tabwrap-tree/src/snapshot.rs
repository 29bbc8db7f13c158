//! Snapshot capture and restore
//!
//! A snapshot is an opaque blob capturing one node and every owned
//! descendant, keyed by the compatibility level it was captured at. Restore
//! rejects a blob captured at a different level. The restored subtree gets
//! fresh node identities throughout; references to nodes *outside* the
//! subtree are carried by identity and remain valid as long as those nodes
//! stay live.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TreeError};
use crate::node::{ChildSlot, Field, FieldValue, Node, NodeId, NodeKind};
use crate::tree::MetadataTree;

#[derive(Debug, Serialize, Deserialize)]
struct NodeSnapshot {
    kind: NodeKind,
    fields: BTreeMap<Field, FieldValue>,
    children: BTreeMap<ChildSlot, Vec<NodeSnapshot>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    compatibility_level: u32,
    root: NodeSnapshot,
}

impl MetadataTree {
    /// Serialize a node and its owned descendants into an opaque blob
    ///
    /// # Errors
    /// `NodeNotFound` if any node of the subtree is not live.
    pub fn serialize_node(&self, id: NodeId, compatibility_level: u32) -> Result<String> {
        let root = self.capture(id)?;
        let envelope = SnapshotEnvelope {
            compatibility_level,
            root,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    fn capture(&self, id: NodeId) -> Result<NodeSnapshot> {
        let node = self.node_ref(id)?;
        let mut children = BTreeMap::new();
        for (slot, list) in &node.children {
            let mut snaps = Vec::with_capacity(list.len());
            for child in list {
                snaps.push(self.capture(*child)?);
            }
            children.insert(*slot, snaps);
        }
        Ok(NodeSnapshot {
            kind: node.kind,
            fields: node.fields.clone(),
            children,
        })
    }

    /// Reconstruct an equivalent subtree from a snapshot blob
    ///
    /// The restored nodes are fresh instances with new identities. The root
    /// is returned detached; the caller attaches it to a parent child list.
    ///
    /// # Errors
    /// `SnapshotDecode` if the blob cannot be parsed,
    /// `SnapshotLevelMismatch` if the blob was captured at a different
    /// compatibility level.
    pub fn deserialize_node(&mut self, blob: &str, compatibility_level: u32) -> Result<NodeId> {
        let envelope: SnapshotEnvelope = serde_json::from_str(blob)?;
        if envelope.compatibility_level != compatibility_level {
            return Err(TreeError::SnapshotLevelMismatch {
                expected: compatibility_level,
                actual: envelope.compatibility_level,
            });
        }
        Ok(self.rebuild(&envelope.root))
    }

    fn rebuild(&mut self, snap: &NodeSnapshot) -> NodeId {
        let id = self.create_node(snap.kind);
        let mut children = BTreeMap::new();
        for (slot, list) in &snap.children {
            let restored: Vec<NodeId> = list.iter().map(|c| self.rebuild(c)).collect();
            children.insert(*slot, restored);
        }
        let node = Node {
            id,
            kind: snap.kind,
            fields: snap.fields.clone(),
            children,
        };
        self.insert_node(node);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition_with_coverage(tree: &mut MetadataTree) -> (NodeId, NodeId) {
        let p = tree.create_node(NodeKind::Partition);
        tree.set_field(p, Field::Name, FieldValue::Text("P1".into()))
            .unwrap();
        tree.set_field(p, Field::Query, FieldValue::Text("SELECT 1".into()))
            .unwrap();
        let cov = tree.create_node(NodeKind::CoverageDefinition);
        tree.set_field(cov, Field::Expression, FieldValue::Text("[Year] = 2024".into()))
            .unwrap();
        tree.add_child(p, ChildSlot::Coverage, cov, None).unwrap();
        (p, cov)
    }

    #[test]
    fn test_restore_reconstructs_fields_and_children() {
        let mut tree = MetadataTree::new();
        let (p, _cov) = partition_with_coverage(&mut tree);

        let blob = tree.serialize_node(p, 1603).unwrap();
        tree.delete_subtree(p).unwrap();

        let restored = tree.deserialize_node(&blob, 1603).unwrap();
        assert_eq!(
            tree.field(restored, Field::Name).unwrap(),
            Some(FieldValue::Text("P1".into()))
        );
        let coverage = tree.children(restored, ChildSlot::Coverage).unwrap();
        assert_eq!(coverage.len(), 1);
        assert_eq!(
            tree.field(coverage[0], Field::Expression).unwrap(),
            Some(FieldValue::Text("[Year] = 2024".into()))
        );
    }

    #[test]
    fn test_restore_mints_fresh_identities() {
        let mut tree = MetadataTree::new();
        let (p, cov) = partition_with_coverage(&mut tree);

        let blob = tree.serialize_node(p, 1603).unwrap();
        let restored = tree.deserialize_node(&blob, 1603).unwrap();

        assert_ne!(restored, p);
        let new_cov = tree.children(restored, ChildSlot::Coverage).unwrap()[0];
        assert_ne!(new_cov, cov);
    }

    #[test]
    fn test_level_mismatch_rejected() {
        let mut tree = MetadataTree::new();
        let (p, _) = partition_with_coverage(&mut tree);

        let blob = tree.serialize_node(p, 1603).unwrap();
        let err = tree.deserialize_node(&blob, 1500).unwrap_err();
        assert!(matches!(err, TreeError::SnapshotLevelMismatch { .. }));
    }

    #[test]
    fn test_external_references_survive_by_identity() {
        let mut tree = MetadataTree::new();
        let ds = tree.create_node(NodeKind::DataSource);
        let p = tree.create_node(NodeKind::Partition);
        tree.set_field(p, Field::DataSource, FieldValue::Reference(ds))
            .unwrap();

        let blob = tree.serialize_node(p, 1500).unwrap();
        tree.delete_subtree(p).unwrap();
        let restored = tree.deserialize_node(&blob, 1500).unwrap();

        assert_eq!(
            tree.field(restored, Field::DataSource).unwrap(),
            Some(FieldValue::Reference(ds))
        );
    }
}
