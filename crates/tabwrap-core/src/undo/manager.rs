use std::collections::HashSet;

use tracing::debug;

use crate::errors::{Result, TabwrapError};
use crate::model::ObjectId;
use crate::undo::action::{UndoAction, UndoGroup};

/// Token returned by `begin_update`, consumed by `end_update`
///
/// Carries the nesting depth it was issued at so mismatched begin/end pairs
/// are caught instead of silently committing the wrong group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateToken {
    pub(crate) depth: usize,
}

#[derive(Debug)]
struct OpenTransaction {
    label: String,
    depth: usize,
    actions: Vec<UndoAction>,
}

/// Linear, transaction-grouped undo/redo log with a cursor
///
/// Groups `[0, cursor)` are undoable, `[cursor, len)` are redoable.
/// Recording a new group truncates the redo tail. Nested `begin_update`
/// calls coalesce into the outermost group (reference-counted); the
/// outermost label wins. Actions recorded with no open transaction form a
/// single-action group labelled by the action's own summary.
///
/// The manager holds state only; replay is driven by the document, which
/// marks the manager corrupted if a group fails mid-replay. A corrupted
/// manager refuses all further undo/redo.
#[derive(Debug, Default)]
pub struct UndoManager {
    log: Vec<UndoGroup>,
    cursor: usize,
    open: Option<OpenTransaction>,
    corrupted: bool,
    replaying: bool,
}

impl UndoManager {
    pub fn new() -> Self {
        Self {
            log: Vec::new(),
            cursor: 0,
            open: None,
            corrupted: false,
            replaying: false,
        }
    }

    /// Open a transaction, or join the one already open
    pub fn begin(&mut self, label: &str) -> UpdateToken {
        match &mut self.open {
            Some(open) => {
                open.depth += 1;
                UpdateToken { depth: open.depth }
            }
            None => {
                self.open = Some(OpenTransaction {
                    label: label.to_string(),
                    depth: 1,
                    actions: Vec::new(),
                });
                UpdateToken { depth: 1 }
            }
        }
    }

    /// Close one nesting level; the outermost close commits the group
    ///
    /// # Errors
    /// `NoOpenTransaction` if no transaction is open, `TokenMismatch` if the
    /// token was issued at a different depth than the current one.
    pub fn end(&mut self, token: UpdateToken) -> Result<()> {
        let open = self.open.as_mut().ok_or(TabwrapError::NoOpenTransaction)?;
        if token.depth != open.depth {
            return Err(TabwrapError::TokenMismatch {
                expected: open.depth,
                actual: token.depth,
            });
        }
        open.depth -= 1;
        if open.depth > 0 {
            return Ok(());
        }
        let open = self.open.take().expect("transaction checked above");
        if !open.actions.is_empty() {
            debug!(label = %open.label, actions = open.actions.len(), "transaction committed");
            self.push_group(UndoGroup {
                label: open.label,
                actions: open.actions,
            });
        }
        Ok(())
    }

    /// Record a reversible action
    ///
    /// No-op while the document is replaying the log. Outside a transaction
    /// the action becomes its own group.
    pub fn record(&mut self, action: UndoAction) {
        if self.replaying {
            return;
        }
        match &mut self.open {
            Some(open) => open.actions.push(action),
            None => {
                let label = action.summary();
                self.push_group(UndoGroup {
                    label,
                    actions: vec![action],
                });
            }
        }
    }

    fn push_group(&mut self, group: UndoGroup) {
        self.log.truncate(self.cursor);
        self.log.push(group);
        self.cursor = self.log.len();
    }

    /// Whether an undo is currently possible
    pub fn can_undo(&self) -> bool {
        !self.corrupted && self.open.is_none() && self.cursor > 0
    }

    /// Whether a redo is currently possible
    pub fn can_redo(&self) -> bool {
        !self.corrupted && self.open.is_none() && self.cursor < self.log.len()
    }

    /// Label of the group the next `undo()` would reverse
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.log.get(i))
            .map(|g| g.label.as_str())
    }

    /// Label of the group the next `redo()` would replay
    pub fn redo_description(&self) -> Option<&str> {
        self.log.get(self.cursor).map(|g| g.label.as_str())
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    pub fn transaction_open(&self) -> bool {
        self.open.is_some()
    }

    pub(crate) fn peek_undo(&self) -> Option<&UndoGroup> {
        self.cursor.checked_sub(1).and_then(|i| self.log.get(i))
    }

    #[cfg(test)]
    pub(crate) fn peek_undo_mut(&mut self) -> Option<&mut UndoGroup> {
        self.cursor.checked_sub(1).and_then(|i| self.log.get_mut(i))
    }

    pub(crate) fn peek_redo(&self) -> Option<&UndoGroup> {
        self.log.get(self.cursor)
    }

    pub(crate) fn shift_back(&mut self) {
        self.cursor -= 1;
    }

    pub(crate) fn shift_forward(&mut self) {
        self.cursor += 1;
    }

    pub(crate) fn set_replaying(&mut self, on: bool) {
        self.replaying = on;
    }

    pub(crate) fn mark_corrupted(&mut self) {
        self.corrupted = true;
    }

    /// Take the open transaction's recorded actions and discard the group
    ///
    /// Used by rollback: the aborted group must not become redoable.
    pub(crate) fn take_open_actions(&mut self) -> Option<Vec<UndoAction>> {
        self.open.take().map(|open| open.actions)
    }

    /// Number of committed groups (both sides of the cursor)
    pub fn group_count(&self) -> usize {
        self.log.len()
    }

    /// Number of groups on the redo side of the cursor
    pub(crate) fn redo_tail_len(&self) -> usize {
        self.log.len() - self.cursor
    }

    /// Wrapper ids referenced anywhere in the log or the open transaction
    ///
    /// A removed wrapper outside this set can never be restored.
    pub(crate) fn referenced_objects(&self) -> HashSet<ObjectId> {
        let mut out = HashSet::new();
        for group in &self.log {
            for action in &group.actions {
                action.referenced_objects(&mut out);
            }
        }
        if let Some(open) = &self.open {
            for action in &open.actions {
                action.referenced_objects(&mut out);
            }
        }
        out
    }
}
