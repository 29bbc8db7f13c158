//! Document consistency checks
//!
//! The registry bijection: every non-removed wrapper's node is registered
//! back to that same wrapper, and every registry entry points at a live
//! wrapper that points back. Run after undo/redo in tests, and available to
//! callers that want to audit a session.

use crate::document::Document;
use crate::errors::{Result, TabwrapError};

/// Verify the node/wrapper bijection of a document
///
/// # Errors
/// `ConsistencyViolation` describing the first broken entry found.
pub fn verify_registry_bijection(doc: &Document) -> Result<()> {
    for object in doc.objects() {
        if object.is_removed() {
            continue;
        }
        match doc.registry().lookup(object.node()) {
            Some(mapped) if mapped == object.id() => {}
            Some(mapped) => {
                return Err(TabwrapError::ConsistencyViolation {
                    detail: format!(
                        "node {} of wrapper {} is registered to a different wrapper {}",
                        object.node(),
                        object.id(),
                        mapped
                    ),
                });
            }
            None => {
                return Err(TabwrapError::ConsistencyViolation {
                    detail: format!(
                        "non-removed wrapper {} has no registry entry for node {}",
                        object.id(),
                        object.node()
                    ),
                });
            }
        }
        if !doc.tree().contains(object.node()) {
            return Err(TabwrapError::ConsistencyViolation {
                detail: format!(
                    "wrapper {} points at node {} which is not live",
                    object.id(),
                    object.node()
                ),
            });
        }
    }

    for (node, wrapper) in doc.registry().entries() {
        let object = doc.object(wrapper).map_err(|_| TabwrapError::ConsistencyViolation {
            detail: format!("registry maps node {node} to unknown wrapper {wrapper}"),
        })?;
        if object.is_removed() {
            return Err(TabwrapError::ConsistencyViolation {
                detail: format!("registry maps node {node} to removed wrapper {wrapper}"),
            });
        }
        if object.node() != node {
            return Err(TabwrapError::ConsistencyViolation {
                detail: format!(
                    "registry maps node {node} to wrapper {wrapper} which owns node {}",
                    object.node()
                ),
            });
        }
    }

    Ok(())
}
