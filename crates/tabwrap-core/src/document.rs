//! Document session
//!
//! One `Document` per open model: it owns the metadata tree, the wrapper
//! store, the lookup registry, the undo/redo log and the registered change
//! hooks. All mutation funnels through here so the tree, the registry and
//! the log can never drift apart. Single-threaded by design; callers pass
//! the document by reference to every mutating entry point.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use tabwrap_tree::{Field, FieldValue, MetadataTree, NodeId, NodeKind, TreeError};

use crate::deps::{extract_references, Dependency, DependsOnList};
use crate::errors::{Result, TabwrapError};
use crate::events::{ChangeDecision, ChangeHook, PropertyChange};
use crate::model::{CollectionSlot, ObjectId, ObjectKind, Property, Value, WrapperObject};
use crate::registry::WrapperRegistry;
use crate::rules::{capabilities, deletion, invariants};
use crate::snapshot::{self, Snapshot};
use crate::undo::{ClearedEntry, UndoAction, UndoManager, UpdateToken};

/// The editing session over one model document
pub struct Document {
    tree: MetadataTree,
    objects: HashMap<ObjectId, WrapperObject>,
    registry: WrapperRegistry,
    undo: UndoManager,
    hooks: Vec<Box<dyn ChangeHook>>,
    compatibility_level: u32,
    /// Bumped on any change to the set of live names (create, delete,
    /// undelete, rename); dependency caches key off it.
    names_version: u64,
    /// Every identity re-mint performed by a snapshot restore, stale to
    /// fresh. Snapshots recorded earlier still carry the stale identities;
    /// following the chain at restore time re-resolves their reference
    /// fields to whatever node currently stands in for the target.
    node_aliases: HashMap<NodeId, NodeId>,
    model: ObjectId,
}

impl Document {
    /// Create a new document with an empty model root
    pub fn new(compatibility_level: u32) -> Self {
        let mut tree = MetadataTree::new();
        let root = tree.create_node(NodeKind::Model);
        let model = ObjectId::fresh();
        let mut registry = WrapperRegistry::new();
        registry
            .register(root, model)
            .expect("fresh registry cannot hold the root already");
        let mut objects = HashMap::new();
        objects.insert(model, WrapperObject::new(model, ObjectKind::Model, root, None));
        Self {
            tree,
            objects,
            registry,
            undo: UndoManager::new(),
            hooks: Vec::new(),
            compatibility_level,
            names_version: 0,
            node_aliases: HashMap::new(),
            model,
        }
    }

    /// Open a document over an already-populated tree
    ///
    /// Discovers every node reachable from the model root and builds a
    /// wrapper plus a registry entry for each.
    ///
    /// # Errors
    /// `ConsistencyViolation` if the tree does not hold exactly one model
    /// root.
    pub fn from_tree(tree: MetadataTree, compatibility_level: u32) -> Result<Self> {
        let roots = tree.nodes_of_kind(NodeKind::Model);
        let root = match roots.as_slice() {
            [root] => *root,
            _ => {
                return Err(TabwrapError::ConsistencyViolation {
                    detail: format!("expected exactly one model root, found {}", roots.len()),
                })
            }
        };
        let mut doc = Self {
            tree,
            objects: HashMap::new(),
            registry: WrapperRegistry::new(),
            undo: UndoManager::new(),
            hooks: Vec::new(),
            compatibility_level,
            names_version: 0,
            node_aliases: HashMap::new(),
            model: ObjectId::fresh(),
        };
        doc.model = doc.wrap_existing(root, None)?;
        Ok(doc)
    }

    fn wrap_existing(
        &mut self,
        node: NodeId,
        parent: Option<(ObjectId, CollectionSlot)>,
    ) -> Result<ObjectId> {
        let kind = ObjectKind::from_node_kind(self.tree.kind(node)?);
        let id = ObjectId::fresh();
        self.registry.register(node, id)?;
        self.objects
            .insert(id, WrapperObject::new(id, kind, node, parent));
        for slot in kind.collection_slots() {
            for child in self.tree.children(node, slot.child_slot())? {
                self.wrap_existing(child, Some((id, *slot)))?;
            }
        }
        Ok(id)
    }

    /// The model root wrapper
    pub fn model(&self) -> ObjectId {
        self.model
    }

    pub fn compatibility_level(&self) -> u32 {
        self.compatibility_level
    }

    /// Register a change hook for the rest of the session
    pub fn add_hook(&mut self, hook: Box<dyn ChangeHook>) {
        self.hooks.push(hook);
    }

    // ===== Wrapper store access =====

    /// A wrapper by id, whether attached or removed
    pub fn object(&self, id: ObjectId) -> Result<&WrapperObject> {
        self.objects
            .get(&id)
            .ok_or(TabwrapError::ObjectNotFound { object_id: id })
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut WrapperObject> {
        self.objects
            .get_mut(&id)
            .ok_or(TabwrapError::ObjectNotFound { object_id: id })
    }

    fn attached(&self, id: ObjectId) -> Result<&WrapperObject> {
        let object = self.object(id)?;
        if object.removed {
            return Err(TabwrapError::ObjectRemoved { object_id: id });
        }
        Ok(object)
    }

    /// Iterate all wrappers, attached and removed (arbitrary order)
    pub fn objects(&self) -> impl Iterator<Item = &WrapperObject> {
        self.objects.values()
    }

    /// The wrapper owning a node, via the registry
    pub fn lookup(&self, node: NodeId) -> Option<ObjectId> {
        self.registry.lookup(node)
    }

    pub fn registry(&self) -> &WrapperRegistry {
        &self.registry
    }

    pub fn tree(&self) -> &MetadataTree {
        &self.tree
    }

    /// Verify the registry bijection over the whole document
    pub fn verify_consistency(&self) -> Result<()> {
        invariants::verify_registry_bijection(self)
    }

    // ===== Collections =====

    /// Members of a collection, in order
    pub fn members(&self, owner: ObjectId, slot: CollectionSlot) -> Result<Vec<ObjectId>> {
        let owner_node = self.attached(owner)?.node;
        let mut members = Vec::new();
        for child in self.tree.children(owner_node, slot.child_slot())? {
            let id = self
                .registry
                .lookup(child)
                .ok_or_else(|| TabwrapError::ConsistencyViolation {
                    detail: format!("node {child} in a child list has no wrapper"),
                })?;
            members.push(id);
        }
        Ok(members)
    }

    /// Display name of an object, if its kind carries one
    pub fn name(&self, id: ObjectId) -> Result<Option<String>> {
        let object = self.object(id)?;
        match object.kind.name_property() {
            Some(prop) => Ok(self
                .get_property(id, prop)?
                .as_text()
                .map(|s| s.to_string())),
            None => Ok(None),
        }
    }

    /// First name not already taken in a collection: `base`, `base 2`, ...
    pub(crate) fn unique_name(
        &self,
        owner: ObjectId,
        slot: CollectionSlot,
        base: &str,
    ) -> Result<String> {
        let mut taken = Vec::new();
        for member in self.members(owner, slot)? {
            if let Some(name) = self.name(member)? {
                taken.push(name);
            }
        }
        if !taken.iter().any(|n| n == base) {
            return Ok(base.to_string());
        }
        let mut i = 2;
        loop {
            let candidate = format!("{base} {i}");
            if !taken.iter().any(|n| *n == candidate) {
                return Ok(candidate);
            }
            i += 1;
        }
    }

    // ===== Properties =====

    /// Read a property
    ///
    /// Reference-valued properties resolve through the registry; a dangling
    /// node reference reads as `Value::None`.
    pub fn get_property(&self, id: ObjectId, property: Property) -> Result<Value> {
        let object = self.object(id)?;
        let kind = object.kind;
        let node = object.node;
        match property {
            Property::CoverageDefinition => {
                if !matches!(kind, ObjectKind::Partition | ObjectKind::MPartition) {
                    return Err(TabwrapError::UnsupportedProperty { kind, property });
                }
                let coverage = self.tree.children(node, CollectionSlot::Coverage.child_slot())?;
                Ok(match coverage.first().and_then(|n| self.registry.lookup(*n)) {
                    Some(wrapper) => Value::Object(wrapper),
                    None => Value::None,
                })
            }
            _ => {
                let field = property
                    .field()
                    .ok_or(TabwrapError::UnsupportedProperty { kind, property })?;
                let value = match self.tree.field(node, field) {
                    Err(TreeError::UnsupportedField { .. }) => {
                        return Err(TabwrapError::UnsupportedProperty { kind, property })
                    }
                    other => other?,
                };
                Ok(match value {
                    Some(FieldValue::Text(s)) => Value::Text(s),
                    Some(FieldValue::Timestamp(t)) => Value::Timestamp(t),
                    Some(FieldValue::Reference(n)) => match self.registry.lookup(n) {
                        Some(wrapper) => Value::Object(wrapper),
                        None => Value::None,
                    },
                    None => Value::None,
                })
            }
        }
    }

    /// Set a property, recording an undo action
    pub fn set_property(&mut self, id: ObjectId, property: Property, value: Value) -> Result<()> {
        self.set_property_opt(id, property, value, true)
    }

    /// Set a property without recording an undo action
    ///
    /// For derived/cache fields only: the mutation is real but will not be
    /// reversed by `undo()`.
    pub fn set_property_non_undoable(
        &mut self,
        id: ObjectId,
        property: Property,
        value: Value,
    ) -> Result<()> {
        self.set_property_opt(id, property, value, false)
    }

    fn set_property_opt(
        &mut self,
        id: ObjectId,
        property: Property,
        new: Value,
        mut undoable: bool,
    ) -> Result<()> {
        let kind = self.attached(id)?.kind;
        let old = self.get_property(id, property)?;
        if old == new {
            return Ok(());
        }

        let change = PropertyChange {
            object: id,
            kind,
            property,
            old: old.clone(),
            new: new.clone(),
        };
        for hook in &self.hooks {
            match hook.property_changing(&change) {
                ChangeDecision::Cancel => return Ok(()),
                ChangeDecision::AllowNonUndoable => undoable = false,
                ChangeDecision::Allow => {}
            }
        }

        self.write_property(id, property, &new)?;

        if undoable {
            self.record_action(UndoAction::PropertyChanged {
                object: id,
                property,
                old,
                new,
            });
        }
        for hook in &self.hooks {
            hook.property_changed(&change);
        }
        debug!(object = %id, property = ?property, undoable, "property set");
        Ok(())
    }

    /// Apply a property value to the tree, with no events and no recording
    fn write_property(&mut self, id: ObjectId, property: Property, value: &Value) -> Result<()> {
        let (kind, node) = {
            let object = self.object(id)?;
            (object.kind, object.node)
        };
        match property {
            Property::RefreshedTime | Property::CoverageDefinition => {
                return Err(TabwrapError::ReadOnlyProperty { kind, property });
            }
            Property::DataSource => {
                if kind != ObjectKind::Partition {
                    return Err(TabwrapError::UnsupportedProperty { kind, property });
                }
                match value {
                    Value::Object(target) => {
                        let target_obj = self.attached(*target)?;
                        if target_obj.kind != ObjectKind::DataSource {
                            return Err(TabwrapError::WrongKind {
                                object_id: *target,
                                expected: ObjectKind::DataSource,
                                actual: target_obj.kind,
                            });
                        }
                        let target_node = target_obj.node;
                        self.tree
                            .set_field(node, Field::DataSource, FieldValue::Reference(target_node))?;
                    }
                    Value::None => self.tree.unset_field(node, Field::DataSource)?,
                    other => {
                        return Err(TabwrapError::InvalidValue {
                            property,
                            detail: format!("expected a data source reference, got {other:?}"),
                        })
                    }
                }
            }
            _ => {
                let field = property
                    .field()
                    .ok_or(TabwrapError::UnsupportedProperty { kind, property })?;
                let write = match value {
                    Value::Text(s) => Some(FieldValue::Text(s.clone())),
                    Value::None => None,
                    other => {
                        return Err(TabwrapError::InvalidValue {
                            property,
                            detail: format!("expected text, got {other:?}"),
                        })
                    }
                };
                let result = match write {
                    Some(v) => self.tree.set_field(node, field, v),
                    None => self.tree.unset_field(node, field),
                };
                if let Err(TreeError::UnsupportedField { .. }) = result {
                    return Err(TabwrapError::UnsupportedProperty { kind, property });
                }
                result?;
            }
        }

        if kind.name_property() == Some(property) {
            self.names_version += 1;
        }
        if kind.expression_property() == Some(property) {
            let object = self.object_mut(id)?;
            object.expr_version += 1;
            object.deps = None;
        }
        Ok(())
    }

    /// Whether a property is shown for this object
    pub fn is_browsable(&self, id: ObjectId, property: Property) -> Result<bool> {
        let kind = self.object(id)?.kind;
        Ok(capabilities::browsable(kind, property, self.compatibility_level))
    }

    /// Whether a property is mutable for this object
    pub fn is_editable(&self, id: ObjectId, property: Property) -> Result<bool> {
        let kind = self.object(id)?.kind;
        Ok(capabilities::editable(kind, property, self.compatibility_level))
    }

    // ===== Structural operations =====

    /// Create a node plus its wrapper inside a collection
    ///
    /// Used by the per-kind creation functions in `ops`.
    pub(crate) fn create_object(
        &mut self,
        kind: ObjectKind,
        owner: ObjectId,
        slot: CollectionSlot,
        fields: Vec<(Field, FieldValue)>,
        summary: String,
    ) -> Result<ObjectId> {
        let owner_node = self.attached(owner)?.node;
        let node = self.tree.create_node(kind.node_kind());
        for (field, value) in fields {
            self.tree.set_field(node, field, value)?;
        }
        let index = self.tree.children(owner_node, slot.child_slot())?.len();
        self.tree.add_child(owner_node, slot.child_slot(), node, None)?;

        let id = ObjectId::fresh();
        self.registry.register(node, id)?;
        self.objects
            .insert(id, WrapperObject::new(id, kind, node, Some((owner, slot))));
        self.names_version += 1;

        let snapshot = snapshot::capture(&self.tree, node, self.compatibility_level)?;
        self.record_action(UndoAction::Created {
            object: id,
            owner,
            slot,
            index,
            snapshot,
            summary: summary.clone(),
        });
        debug!(object = %id, kind = ?kind, %summary, "object created");
        Ok(id)
    }

    /// Delete an object
    ///
    /// # Errors
    /// `DeletionBlocked` with a user-facing reason when a structural
    /// precondition is violated; the document is left unchanged.
    pub fn delete(&mut self, id: ObjectId) -> Result<()> {
        deletion::allow_delete(self, id)?;
        let kind = self.object(id)?.kind;
        let label = self
            .name(id)?
            .map(|n| format!("'{n}'"))
            .unwrap_or_else(|| id.to_string());
        let summary = format!("Delete {} {}", kind.display_name(), label);

        let (owner, slot, index, snapshot) = self.detach_object(id, true)?;
        self.record_action(UndoAction::Deleted {
            object: id,
            owner,
            slot,
            index,
            snapshot: snapshot.expect("detach with snapshot requested"),
            summary: summary.clone(),
        });
        debug!(object = %id, %summary, "object deleted");
        Ok(())
    }

    /// Remove every member of a collection as one undoable action
    ///
    /// Members are snapshotted first; undo restores them in their original
    /// order with their original property values.
    pub fn clear_collection(&mut self, owner: ObjectId, slot: CollectionSlot) -> Result<()> {
        let members = self.members(owner, slot)?;
        if members.is_empty() {
            return Ok(());
        }
        let mut entries = Vec::with_capacity(members.len());
        for member in members {
            let (_, _, _, snapshot) = self.detach_object(member, true)?;
            entries.push(ClearedEntry {
                object: member,
                snapshot: snapshot.expect("detach with snapshot requested"),
            });
        }
        debug!(owner = %owner, slot = ?slot, cleared = entries.len(), "collection cleared");
        self.record_action(UndoAction::CollectionCleared { owner, slot, entries });
        Ok(())
    }

    /// Record an action, sweeping the wrapper store if this truncated the
    /// redo tail
    fn record_action(&mut self, action: UndoAction) {
        let had_tail = self.undo.redo_tail_len() > 0;
        self.undo.record(action);
        if had_tail && self.undo.redo_tail_len() == 0 {
            self.dispose_unreferenced();
        }
    }

    /// Drop removed wrappers no logged action references any longer
    ///
    /// Runs when the redo tail is truncated or an open transaction is
    /// rolled back: a removed wrapper kept alive only by discarded actions
    /// can never be restored again. Detached descendants of a surviving
    /// wrapper are kept with it.
    fn dispose_unreferenced(&mut self) {
        let mut keep = self.undo.referenced_objects();
        let mut queue: Vec<ObjectId> = keep.iter().copied().collect();
        while let Some(id) = queue.pop() {
            if let Some(object) = self.objects.get(&id) {
                for child in &object.detached_children {
                    if keep.insert(*child) {
                        queue.push(*child);
                    }
                }
            }
        }
        let before = self.objects.len();
        self.objects
            .retain(|id, object| !object.removed || keep.contains(id));
        let disposed = before - self.objects.len();
        if disposed > 0 {
            debug!(disposed, "disposed unreferenced wrappers");
        }
    }

    /// Detach a wrapper from the document
    ///
    /// The "remove references" half of the reattachment protocol: wrappers
    /// of owned descendant nodes are remembered in subtree walk order so a
    /// later attach can re-bind them to the freshly restored nodes. The
    /// wrapper itself survives, flagged removed, for as long as undo
    /// actions reference it.
    fn detach_object(
        &mut self,
        id: ObjectId,
        take_snapshot: bool,
    ) -> Result<(ObjectId, CollectionSlot, usize, Option<Snapshot>)> {
        let (node, owner, slot) = {
            let object = self.attached(id)?;
            let (owner, slot) = object
                .parent
                .ok_or(TabwrapError::NoParentCollection { object_id: id })?;
            (object.node, owner, slot)
        };

        let subtree = self.tree.subtree(node)?;
        let mut detached_children = Vec::with_capacity(subtree.len() - 1);
        for descendant in subtree.iter().skip(1) {
            let wrapper = self.registry.lookup(*descendant).ok_or_else(|| {
                TabwrapError::ConsistencyViolation {
                    detail: format!("descendant node {descendant} has no wrapper"),
                }
            })?;
            detached_children.push(wrapper);
        }

        let snapshot = if take_snapshot {
            Some(snapshot::capture(&self.tree, node, self.compatibility_level)?)
        } else {
            None
        };

        let owner_node = self.attached(owner)?.node;
        let index = self.tree.remove_child(owner_node, slot.child_slot(), node)?;
        for descendant in &subtree {
            if let Some(wrapper) = self.registry.unregister(*descendant) {
                if let Some(object) = self.objects.get_mut(&wrapper) {
                    object.removed = true;
                }
            }
        }
        self.tree.delete_subtree(node)?;

        let object = self.object_mut(id)?;
        object.detached_children = detached_children;
        self.names_version += 1;
        Ok((owner, slot, index, snapshot))
    }

    /// Re-attach a previously detached wrapper from its snapshot
    ///
    /// The "reinit" half of the reattachment protocol: the restored subtree
    /// has fresh node identities throughout, so the detached descendant
    /// wrappers recorded at detach time are re-bound positionally against
    /// the new subtree. Stale registry entries cannot survive this because
    /// the old nodes were unregistered when they left the tree.
    fn attach_object(
        &mut self,
        id: ObjectId,
        owner: ObjectId,
        slot: CollectionSlot,
        index: usize,
        snapshot: &Snapshot,
    ) -> Result<()> {
        let (kind, old_node) = {
            let object = self.object(id)?;
            if !object.removed {
                return Err(TabwrapError::ConsistencyViolation {
                    detail: format!("attach of wrapper {id} which is still attached"),
                });
            }
            (object.kind, object.node)
        };

        let node = snapshot::restore(&mut self.tree, snapshot, self.compatibility_level)?;
        let restored_kind = ObjectKind::from_node_kind(self.tree.kind(node)?);
        if restored_kind != kind {
            return Err(TabwrapError::ConsistencyViolation {
                detail: format!(
                    "snapshot restored a {restored_kind:?} node for a {kind:?} wrapper"
                ),
            });
        }

        let owner_node = self.attached(owner)?.node;
        self.tree
            .add_child(owner_node, slot.child_slot(), node, Some(index))?;
        self.registry.register(node, id)?;
        self.tree.rebind_references(old_node, node);
        self.node_aliases.insert(old_node, node);
        {
            let object = self.object_mut(id)?;
            object.node = node;
            object.removed = false;
            object.parent = Some((owner, slot));
        }

        let descendants: Vec<NodeId> = self.tree.subtree(node)?[1..].to_vec();
        let backups = std::mem::take(&mut self.object_mut(id)?.detached_children);
        if descendants.len() != backups.len() {
            return Err(TabwrapError::ConsistencyViolation {
                detail: format!(
                    "restored subtree has {} descendants but {} wrappers were detached",
                    descendants.len(),
                    backups.len()
                ),
            });
        }
        for (new_node, wrapper) in descendants.into_iter().zip(backups) {
            let new_kind = ObjectKind::from_node_kind(self.tree.kind(new_node)?);
            let stale = {
                let object = self.object_mut(wrapper)?;
                if object.kind != new_kind {
                    return Err(TabwrapError::ConsistencyViolation {
                        detail: format!(
                            "restored node {new_node} is a {new_kind:?} but wrapper {wrapper} is a {:?}",
                            object.kind
                        ),
                    });
                }
                let stale = object.node;
                object.node = new_node;
                object.removed = false;
                stale
            };
            self.tree.rebind_references(stale, new_node);
            self.node_aliases.insert(stale, new_node);
            self.registry.register(new_node, wrapper)?;
        }

        // The restored fields still carry the identities the snapshot
        // captured; any target re-minted since then is reached through the
        // alias chain.
        for (holder, field, target) in self.tree.reference_fields(node)? {
            let current = self.current_identity(target);
            if current != target && self.tree.contains(current) {
                self.tree
                    .set_field(holder, field, FieldValue::Reference(current))?;
            }
        }

        self.names_version += 1;
        Ok(())
    }

    /// Follow the re-mint chain from a possibly stale node identity to the
    /// one currently standing in for it
    fn current_identity(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(next) = self.node_aliases.get(&current) {
            current = *next;
        }
        current
    }

    // ===== Transactions and undo/redo =====

    /// Open (or join) a transaction
    pub fn begin_update(&mut self, label: &str) -> UpdateToken {
        self.undo.begin(label)
    }

    /// Close one transaction level; the outermost close commits the group
    pub fn end_update(&mut self, token: UpdateToken) -> Result<()> {
        let had_tail = self.undo.redo_tail_len() > 0;
        self.undo.end(token)?;
        // Committing truncated the redo tail iff the tail just vanished
        if had_tail && self.undo.redo_tail_len() == 0 && !self.undo.transaction_open() {
            self.dispose_unreferenced();
        }
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Label of the group the next `undo()` would reverse
    pub fn undo_description(&self) -> Option<String> {
        self.undo.undo_description().map(|s| s.to_string())
    }

    /// Label of the group the next `redo()` would replay
    pub fn redo_description(&self) -> Option<String> {
        self.undo.redo_description().map(|s| s.to_string())
    }

    /// Reverse the most recent transaction as one unit
    ///
    /// # Errors
    /// `ConsistencyViolation` if any action fails to reverse; the manager
    /// is then marked corrupted and refuses further undo/redo.
    pub fn undo(&mut self) -> Result<()> {
        if self.undo.is_corrupted() {
            return Err(TabwrapError::UndoLogCorrupted);
        }
        if self.undo.transaction_open() {
            return Err(TabwrapError::TransactionOpen);
        }
        let group = self
            .undo
            .peek_undo()
            .cloned()
            .ok_or(TabwrapError::NothingToUndo)?;
        info!(label = %group.label, "undo");

        self.undo.set_replaying(true);
        let result = group
            .actions
            .iter()
            .rev()
            .try_for_each(|action| self.apply_undo_action(action));
        self.undo.set_replaying(false);

        match result {
            Ok(()) => {
                self.undo.shift_back();
                Ok(())
            }
            Err(e) => {
                self.undo.mark_corrupted();
                error!(label = %group.label, error = %e, "undo failed mid-group");
                Err(TabwrapError::ConsistencyViolation {
                    detail: format!("undo of '{}' failed mid-group: {e}", group.label),
                })
            }
        }
    }

    /// Replay the next undone transaction as one unit
    pub fn redo(&mut self) -> Result<()> {
        if self.undo.is_corrupted() {
            return Err(TabwrapError::UndoLogCorrupted);
        }
        if self.undo.transaction_open() {
            return Err(TabwrapError::TransactionOpen);
        }
        let group = self
            .undo
            .peek_redo()
            .cloned()
            .ok_or(TabwrapError::NothingToRedo)?;
        info!(label = %group.label, "redo");

        self.undo.set_replaying(true);
        let result = group
            .actions
            .iter()
            .try_for_each(|action| self.apply_redo_action(action));
        self.undo.set_replaying(false);

        match result {
            Ok(()) => {
                self.undo.shift_forward();
                Ok(())
            }
            Err(e) => {
                self.undo.mark_corrupted();
                error!(label = %group.label, error = %e, "redo failed mid-group");
                Err(TabwrapError::ConsistencyViolation {
                    detail: format!("redo of '{}' failed mid-group: {e}", group.label),
                })
            }
        }
    }

    /// Undo and discard the open transaction
    ///
    /// Behaves like `undo()` over the actions recorded so far, but the
    /// aborted group never becomes redoable. Used when a later step of a
    /// multi-step operation fails and the whole operation must not be
    /// observable.
    pub fn rollback_current_transaction(&mut self) -> Result<()> {
        let actions = self
            .undo
            .take_open_actions()
            .ok_or(TabwrapError::NoOpenTransaction)?;
        info!(actions = actions.len(), "rolling back open transaction");

        self.undo.set_replaying(true);
        let result = actions
            .iter()
            .rev()
            .try_for_each(|action| self.apply_undo_action(action));
        self.undo.set_replaying(false);

        match result {
            Ok(()) => {
                // Wrappers created inside the aborted group are now
                // removed with nothing left to restore them from
                self.dispose_unreferenced();
                Ok(())
            }
            Err(e) => {
                self.undo.mark_corrupted();
                error!(error = %e, "rollback failed mid-group");
                Err(TabwrapError::ConsistencyViolation {
                    detail: format!("rollback failed mid-group: {e}"),
                })
            }
        }
    }

    fn apply_undo_action(&mut self, action: &UndoAction) -> Result<()> {
        match action {
            UndoAction::PropertyChanged {
                object,
                property,
                old,
                ..
            } => self.replay_property(*object, *property, old),
            UndoAction::Created { object, .. } => {
                self.detach_object(*object, false)?;
                Ok(())
            }
            UndoAction::Deleted {
                object,
                owner,
                slot,
                index,
                snapshot,
                ..
            } => self.attach_object(*object, *owner, *slot, *index, snapshot),
            UndoAction::CollectionCleared { owner, slot, entries } => {
                for (i, entry) in entries.iter().enumerate() {
                    self.attach_object(entry.object, *owner, *slot, i, &entry.snapshot)?;
                }
                Ok(())
            }
        }
    }

    fn apply_redo_action(&mut self, action: &UndoAction) -> Result<()> {
        match action {
            UndoAction::PropertyChanged {
                object,
                property,
                new,
                ..
            } => self.replay_property(*object, *property, new),
            UndoAction::Created {
                object,
                owner,
                slot,
                index,
                snapshot,
                ..
            } => self.attach_object(*object, *owner, *slot, *index, snapshot),
            UndoAction::Deleted { object, .. } => {
                self.detach_object(*object, false)?;
                Ok(())
            }
            UndoAction::CollectionCleared { entries, .. } => {
                for entry in entries {
                    self.detach_object(entry.object, false)?;
                }
                Ok(())
            }
        }
    }

    /// Re-apply a recorded property value during replay
    ///
    /// Fires "changed" notifications (replay is not cancellable) and records
    /// nothing.
    fn replay_property(&mut self, id: ObjectId, property: Property, value: &Value) -> Result<()> {
        let kind = self.object(id)?.kind;
        let old = self.get_property(id, property)?;
        self.write_property(id, property, value)?;
        let change = PropertyChange {
            object: id,
            kind,
            property,
            old,
            new: value.clone(),
        };
        for hook in &self.hooks {
            hook.property_changed(&change);
        }
        Ok(())
    }

    // ===== Dependency tracking =====

    /// The objects this expression-bearing object textually references
    ///
    /// Built lazily; rebuilt after the object's expression changes or after
    /// any change to the set of live names.
    ///
    /// # Errors
    /// `NotAnExpressionObject` for kinds that carry no expression.
    pub fn depends_on(&mut self, id: ObjectId) -> Result<&DependsOnList> {
        let (kind, expr_version) = {
            let object = self.attached(id)?;
            (object.kind, object.expr_version)
        };
        let property = kind
            .expression_property()
            .ok_or(TabwrapError::NotAnExpressionObject { object_id: id })?;

        let fresh = self.object(id)?.deps.as_ref().is_some_and(|d| {
            d.built_names_version == self.names_version && d.built_expr_version == expr_version
        });
        if !fresh {
            let text = match self.get_property(id, property)? {
                Value::Text(s) => s,
                _ => String::new(),
            };
            let names = self.name_map();
            let entries = extract_references(&text)
                .into_iter()
                .map(|name| match names.get(&name) {
                    Some(object) => Dependency::Resolved {
                        name,
                        object: *object,
                    },
                    None => Dependency::Unresolved { name },
                })
                .collect();
            self.object_mut(id)?.deps = Some(DependsOnList {
                entries,
                built_names_version: self.names_version,
                built_expr_version: expr_version,
            });
        }
        Ok(self
            .object(id)?
            .deps
            .as_ref()
            .expect("dependency cache populated above"))
    }

    /// Name index over all attached named objects
    fn name_map(&self) -> HashMap<String, ObjectId> {
        let mut map = HashMap::new();
        for object in self.objects.values() {
            if object.removed {
                continue;
            }
            if let Ok(Some(name)) = self.name(object.id) {
                map.insert(name, object.id);
            }
        }
        map
    }

    /// Read-only last-processed timestamp helper for partitions
    pub fn refreshed_time(&self, id: ObjectId) -> Result<Option<DateTime<Utc>>> {
        match self.get_property(id, Property::RefreshedTime)? {
            Value::Timestamp(t) => Ok(Some(t)),
            _ => Ok(None),
        }
    }
}
