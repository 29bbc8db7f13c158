use thiserror::Error;

use tabwrap_tree::TreeError;

use crate::model::{ObjectId, ObjectKind, Property};

/// Result type alias using TabwrapError
pub type Result<T> = std::result::Result<T, TabwrapError>;

/// Error taxonomy for the wrapper layer
///
/// Three classes matter to callers:
/// - `DeletionBlocked` is recoverable and carries a user-facing reason.
/// - `ConsistencyViolation` and `UndoLogCorrupted` are fatal to the current
///   session's trust in its log; the operation that surfaced them must be
///   treated as aborted.
/// - Everything else is ordinary misuse (unknown id, wrong kind, property a
///   kind does not carry) that correct callers never trigger.
#[derive(Debug, Error)]
pub enum TabwrapError {
    /// Wrapper object not found in the document
    #[error("Object not found: {object_id}")]
    ObjectNotFound { object_id: ObjectId },

    /// Wrapper object is detached (deleted, awaiting undo or disposal)
    #[error("Object was removed: {object_id}")]
    ObjectRemoved { object_id: ObjectId },

    /// A structural precondition blocks the deletion
    #[error("Cannot delete: {reason}")]
    DeletionBlocked { reason: String },

    /// Registry bijection broken or an undo group partially applied
    #[error("Consistency violation: {detail}")]
    ConsistencyViolation { detail: String },

    /// Property set/get on an object kind that does not carry that property
    #[error("Object kind {kind:?} does not support property {property:?}")]
    UnsupportedProperty { kind: ObjectKind, property: Property },

    /// Property is read-only (derived or engine-maintained)
    #[error("Property {property:?} on {kind:?} is read-only")]
    ReadOnlyProperty { kind: ObjectKind, property: Property },

    /// Value has the wrong shape for the property
    #[error("Invalid value for property {property:?}: {detail}")]
    InvalidValue { property: Property, detail: String },

    /// Operation requires an object of a different kind
    #[error("Expected a {expected:?} object, got {actual:?}: {object_id}")]
    WrongKind {
        object_id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// Object kind does not carry an expression
    #[error("Object is not expression-bearing: {object_id}")]
    NotAnExpressionObject { object_id: ObjectId },

    /// Object has no parent collection
    #[error("Object has no parent collection: {object_id}")]
    NoParentCollection { object_id: ObjectId },

    /// Feature requires a higher compatibility level
    #[error("Compatibility level {actual} is below the required {required}")]
    CompatibilityLevelTooLow { required: u32, actual: u32 },

    /// Undo requested with an empty undo side of the log
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Redo requested with an empty redo side of the log
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Undo/redo requested while a transaction is open
    #[error("A transaction is open; end or roll it back first")]
    TransactionOpen,

    /// Rollback requested with no open transaction
    #[error("No transaction is open")]
    NoOpenTransaction,

    /// end_update called with a token from a different nesting depth
    #[error("Update token mismatch: expected depth {expected}, got {actual}")]
    TokenMismatch { expected: usize, actual: usize },

    /// A previous undo/redo failed mid-group; the log can no longer be trusted
    #[error("Undo log is corrupted; the document must be reloaded")]
    UndoLogCorrupted,

    /// Error surfaced by the external metadata tree
    #[error(transparent)]
    Tree(#[from] TreeError),
}
