use thiserror::Error;

use crate::node::{ChildSlot, Field, NodeId, NodeKind};

/// Result type alias using TreeError
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors raised by the metadata tree
#[derive(Debug, Error)]
pub enum TreeError {
    /// Node not found in the arena
    #[error("Node not found: {node_id}")]
    NodeNotFound { node_id: NodeId },

    /// Field is not defined for this node kind
    #[error("Node kind {kind:?} does not support field {field:?}")]
    UnsupportedField { kind: NodeKind, field: Field },

    /// Child slot is not defined for this node kind
    #[error("Node kind {kind:?} does not support child slot {slot:?}")]
    UnsupportedSlot { kind: NodeKind, slot: ChildSlot },

    /// Child node is not a member of the given slot
    #[error("Node {child} is not a child of {parent} in slot {slot:?}")]
    NotAChild {
        parent: NodeId,
        child: NodeId,
        slot: ChildSlot,
    },

    /// Insertion index is past the end of the child list
    #[error("Child index {index} out of bounds for slot {slot:?} (len {len})")]
    IndexOutOfBounds {
        slot: ChildSlot,
        index: usize,
        len: usize,
    },

    /// Snapshot was captured at a different compatibility level
    #[error("Snapshot compatibility level mismatch: blob has {actual}, restore requested {expected}")]
    SnapshotLevelMismatch { expected: u32, actual: u32 },

    /// Snapshot blob could not be decoded
    #[error("Snapshot decode failed: {0}")]
    SnapshotDecode(#[from] serde_json::Error),
}
