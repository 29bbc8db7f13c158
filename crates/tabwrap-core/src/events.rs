//! Change notifications
//!
//! Hooks observe property mutations. The "changing" side fires before any
//! state changes and may veto the mutation outright or downgrade it to
//! non-undoable; the "changed" side fires after the mutation and the undo
//! recording are done. Hooks are registered on the document and called
//! synchronously on the editing thread.

use serde::Serialize;

use crate::model::{ObjectId, ObjectKind, Property, Value};

/// Payload for a property change notification
///
/// Serializable so hooks can forward changes to external sinks as-is.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyChange {
    pub object: ObjectId,
    pub kind: ObjectKind,
    pub property: Property,
    pub old: Value,
    pub new: Value,
}

/// Decision returned from the cancellable "changing" side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDecision {
    /// Proceed as requested
    Allow,
    /// Proceed, but do not record an undo action for this mutation
    AllowNonUndoable,
    /// Veto; no state changes, no rollback needed
    Cancel,
}

/// Observer of property mutations
///
/// Both methods default to no-ops so hooks implement only the side they
/// care about.
pub trait ChangeHook {
    /// Called before the mutation; any `Cancel` among registered hooks wins
    fn property_changing(&self, change: &PropertyChange) -> ChangeDecision {
        let _ = change;
        ChangeDecision::Allow
    }

    /// Called after the mutation has been applied
    fn property_changed(&self, change: &PropertyChange) {
        let _ = change;
    }
}

/// Hook that observes nothing and vetoes nothing
#[derive(Debug, Default)]
pub struct NoopChangeHook;

impl ChangeHook for NoopChangeHook {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_hook_allows() {
        let hook = NoopChangeHook;
        let change = PropertyChange {
            object: ObjectId::fresh(),
            kind: ObjectKind::Table,
            property: Property::Name,
            old: Value::None,
            new: Value::text("T"),
        };
        assert_eq!(hook.property_changing(&change), ChangeDecision::Allow);
    }
}
