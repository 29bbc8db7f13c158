//! Undo snapshots
//!
//! Structural deletes and clears are undone by serialize-then-reconstruct
//! through the tree's own construction path, never by deep in-memory
//! clones. Each snapshot carries the compatibility level it was captured at
//! and an integrity digest verified before restore.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use tabwrap_tree::{MetadataTree, NodeId};

use crate::errors::{Result, TabwrapError};

/// Opaque serialized capture of one node and its owned descendants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    compatibility_level: u32,
    blob: String,
    digest: String,
}

impl Snapshot {
    pub fn compatibility_level(&self) -> u32 {
        self.compatibility_level
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Damage the blob without updating the digest, so the next restore
    /// fails verification
    #[cfg(test)]
    pub(crate) fn corrupt_blob(&mut self) {
        self.blob.push(' ');
    }
}

fn blob_digest(blob: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(blob.as_bytes());
    hex::encode(hasher.finalize())
}

/// Capture a snapshot of a node subtree
pub(crate) fn capture(
    tree: &MetadataTree,
    node: NodeId,
    compatibility_level: u32,
) -> Result<Snapshot> {
    let blob = tree.serialize_node(node, compatibility_level)?;
    let digest = blob_digest(&blob);
    Ok(Snapshot {
        compatibility_level,
        blob,
        digest,
    })
}

/// Reconstruct an equivalent subtree from a snapshot, returning the fresh root
///
/// # Errors
/// `ConsistencyViolation` if the blob no longer matches its digest; tree
/// errors if the blob cannot be decoded or was captured at a different
/// compatibility level.
pub(crate) fn restore(
    tree: &mut MetadataTree,
    snapshot: &Snapshot,
    compatibility_level: u32,
) -> Result<NodeId> {
    let actual = blob_digest(&snapshot.blob);
    if actual != snapshot.digest {
        return Err(TabwrapError::ConsistencyViolation {
            detail: format!(
                "snapshot digest mismatch: recorded {}, recomputed {}",
                snapshot.digest, actual
            ),
        });
    }
    Ok(tree.deserialize_node(&snapshot.blob, compatibility_level)?)
}
