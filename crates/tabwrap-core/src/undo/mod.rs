//! Undo/redo framework
//!
//! A single linear, transaction-grouped log of reversible actions per
//! document. The manager owns the log and the transaction state; the
//! document replays actions against itself, since replay needs the tree,
//! the registry and the wrapper store together.

pub mod action;
pub mod manager;

pub use action::{ClearedEntry, UndoAction, UndoGroup};
pub use manager::{UndoManager, UpdateToken};
