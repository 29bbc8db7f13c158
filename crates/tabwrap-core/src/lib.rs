//! Tabwrap Core - object-wrapper synchronization and undo/redo engine
//!
//! This crate maintains a live, bidirectional correspondence between an
//! application-facing object graph (wrapper objects with properties,
//! capability rules and change notifications) and an external
//! tree-structured metadata model, while supporting multi-step
//! transactional edits that can be fully undone and redone, including
//! structural deletions and bulk-collection clears. It provides:
//! - A lookup registry mapping metadata nodes to their owning wrappers
//! - Uniform property get/set with cancellable change notifications
//! - A linear, transaction-grouped undo/redo log
//! - Snapshot-based undo of deletes and collection clears, with a
//!   detach/reattach protocol that keeps nested wrapper references valid
//!   across restore cycles
//! - Lazy, name-based dependency tracking for expression-bearing objects
//!
//! Single-session, single-document: one `Document` owns all shared state
//! and every mutating entry point takes it by reference.

pub mod deps;
pub mod document;
pub mod errors;
pub mod events;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod registry;
pub mod rules;
pub mod snapshot;
pub mod undo;

// Re-export commonly used types
pub use deps::{Dependency, DependsOnList};
pub use document::Document;
pub use errors::{Result, TabwrapError};
pub use events::{ChangeDecision, ChangeHook, NoopChangeHook, PropertyChange};
pub use model::{CollectionSlot, ObjectId, ObjectKind, Property, Value, WrapperObject};
pub use registry::WrapperRegistry;
pub use snapshot::Snapshot;
pub use undo::{UndoAction, UndoManager, UpdateToken};
