use std::collections::HashSet;

use crate::model::{CollectionSlot, ObjectId, Property, Value};
use crate::snapshot::Snapshot;

/// One member of a cleared collection, in original order
#[derive(Debug, Clone)]
pub struct ClearedEntry {
    pub object: ObjectId,
    pub snapshot: Snapshot,
}

/// One reversible action
///
/// Structural actions carry the snapshot taken when the node (or its
/// predecessor identity) last left the tree, plus enough placement state to
/// re-insert the wrapper where it was.
#[derive(Debug, Clone)]
pub enum UndoAction {
    PropertyChanged {
        object: ObjectId,
        property: Property,
        old: Value,
        new: Value,
    },
    Created {
        object: ObjectId,
        owner: ObjectId,
        slot: CollectionSlot,
        index: usize,
        /// State of the node right after creation; replayed on redo
        snapshot: Snapshot,
        summary: String,
    },
    Deleted {
        object: ObjectId,
        owner: ObjectId,
        slot: CollectionSlot,
        index: usize,
        snapshot: Snapshot,
        summary: String,
    },
    CollectionCleared {
        owner: ObjectId,
        slot: CollectionSlot,
        entries: Vec<ClearedEntry>,
    },
}

impl UndoAction {
    /// Human-readable description, used as the label of implicit
    /// single-action groups
    pub fn summary(&self) -> String {
        match self {
            UndoAction::PropertyChanged { property, .. } => {
                format!("Set {}", property.display_name())
            }
            UndoAction::Created { summary, .. } | UndoAction::Deleted { summary, .. } => {
                summary.clone()
            }
            UndoAction::CollectionCleared { slot, entries, .. } => {
                format!("Clear {} ({} objects)", slot.display_name(), entries.len())
            }
        }
    }

    /// Collect every wrapper id this action keeps alive in the store
    pub(crate) fn referenced_objects(&self, out: &mut HashSet<ObjectId>) {
        match self {
            UndoAction::PropertyChanged {
                object, old, new, ..
            } => {
                out.insert(*object);
                if let Value::Object(target) = old {
                    out.insert(*target);
                }
                if let Value::Object(target) = new {
                    out.insert(*target);
                }
            }
            UndoAction::Created { object, owner, .. }
            | UndoAction::Deleted { object, owner, .. } => {
                out.insert(*object);
                out.insert(*owner);
            }
            UndoAction::CollectionCleared { owner, entries, .. } => {
                out.insert(*owner);
                for entry in entries {
                    out.insert(entry.object);
                }
            }
        }
    }
}

/// A transaction: actions undone/redone as one unit
#[derive(Debug, Clone)]
pub struct UndoGroup {
    pub label: String,
    pub actions: Vec<UndoAction>,
}
