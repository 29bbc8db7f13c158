//! Deletion preconditions
//!
//! Checked before any state changes; a violation surfaces as
//! `DeletionBlocked` with a user-facing reason and leaves everything
//! untouched.

use crate::document::Document;
use crate::errors::{Result, TabwrapError};
use crate::model::{CollectionSlot, ObjectId, ObjectKind};

pub(crate) const TABLE_NEEDS_ONE_PARTITION: &str = "a table must have at least one partition";
pub(crate) const MODEL_CANNOT_BE_DELETED: &str = "the model itself cannot be deleted";

/// Check whether an object may be deleted right now
///
/// # Errors
/// `DeletionBlocked` with the violated precondition's reason.
pub fn allow_delete(doc: &Document, id: ObjectId) -> Result<()> {
    let object = doc.object(id)?;
    match object.kind() {
        ObjectKind::Model => Err(TabwrapError::DeletionBlocked {
            reason: MODEL_CANNOT_BE_DELETED.to_string(),
        }),
        ObjectKind::Partition | ObjectKind::MPartition => {
            let (owner, slot) = object
                .parent()
                .ok_or(TabwrapError::NoParentCollection { object_id: id })?;
            debug_assert_eq!(slot, CollectionSlot::Partitions);
            if doc.members(owner, slot)?.len() <= 1 {
                return Err(TabwrapError::DeletionBlocked {
                    reason: TABLE_NEEDS_ONE_PARTITION.to_string(),
                });
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
