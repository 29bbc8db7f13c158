use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tabwrap_tree::{ChildSlot, NodeId, NodeKind};

use crate::deps::DependsOnList;
use crate::model::Property;

/// Identity of a wrapper object
///
/// Stable across the wrapper's whole lifetime, including delete/undelete
/// cycles where the underlying node identity changes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub(crate) fn fresh() -> Self {
        ObjectId(Uuid::new_v4())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a wrapper object, mirroring the node kinds of the metadata tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Model,
    Table,
    /// Legacy partition (query against a data source)
    Partition,
    /// Power Query partition
    MPartition,
    CoverageDefinition,
    DataSource,
    Role,
    RoleMember,
}

impl ObjectKind {
    /// The tree node kind this wrapper kind owns
    pub fn node_kind(self) -> NodeKind {
        match self {
            ObjectKind::Model => NodeKind::Model,
            ObjectKind::Table => NodeKind::Table,
            ObjectKind::Partition => NodeKind::Partition,
            ObjectKind::MPartition => NodeKind::MPartition,
            ObjectKind::CoverageDefinition => NodeKind::CoverageDefinition,
            ObjectKind::DataSource => NodeKind::DataSource,
            ObjectKind::Role => NodeKind::Role,
            ObjectKind::RoleMember => NodeKind::RoleMember,
        }
    }

    /// Wrapper kind for a tree node kind
    pub fn from_node_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Model => ObjectKind::Model,
            NodeKind::Table => ObjectKind::Table,
            NodeKind::Partition => ObjectKind::Partition,
            NodeKind::MPartition => ObjectKind::MPartition,
            NodeKind::CoverageDefinition => ObjectKind::CoverageDefinition,
            NodeKind::DataSource => ObjectKind::DataSource,
            NodeKind::Role => ObjectKind::Role,
            NodeKind::RoleMember => ObjectKind::RoleMember,
        }
    }

    /// The expression-carrying property for expression-bearing kinds
    pub fn expression_property(self) -> Option<Property> {
        match self {
            ObjectKind::Partition => Some(Property::Query),
            ObjectKind::MPartition | ObjectKind::CoverageDefinition => Some(Property::Expression),
            _ => None,
        }
    }

    /// The property holding this kind's display name, if it has one
    pub fn name_property(self) -> Option<Property> {
        match self {
            ObjectKind::Model | ObjectKind::CoverageDefinition => None,
            ObjectKind::RoleMember => Some(Property::MemberName),
            _ => Some(Property::Name),
        }
    }

    /// Collections this kind owns, in subtree walk order
    pub fn collection_slots(self) -> &'static [CollectionSlot] {
        match self {
            ObjectKind::Model => &[
                CollectionSlot::Tables,
                CollectionSlot::DataSources,
                CollectionSlot::Roles,
            ],
            ObjectKind::Table => &[CollectionSlot::Partitions],
            ObjectKind::Partition | ObjectKind::MPartition => &[CollectionSlot::Coverage],
            ObjectKind::Role => &[CollectionSlot::Members],
            ObjectKind::CoverageDefinition | ObjectKind::DataSource | ObjectKind::RoleMember => &[],
        }
    }

    /// Display label, used in undo action summaries
    pub fn display_name(self) -> &'static str {
        match self {
            ObjectKind::Model => "model",
            ObjectKind::Table => "table",
            ObjectKind::Partition => "partition",
            ObjectKind::MPartition => "M partition",
            ObjectKind::CoverageDefinition => "coverage definition",
            ObjectKind::DataSource => "data source",
            ObjectKind::Role => "role",
            ObjectKind::RoleMember => "role member",
        }
    }
}

/// Semantic collection slots, addressed as (owner object, slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionSlot {
    Tables,
    DataSources,
    Roles,
    Partitions,
    Members,
    Coverage,
}

impl CollectionSlot {
    /// The tree child slot backing this collection
    pub fn child_slot(self) -> ChildSlot {
        match self {
            CollectionSlot::Tables => ChildSlot::Tables,
            CollectionSlot::DataSources => ChildSlot::DataSources,
            CollectionSlot::Roles => ChildSlot::Roles,
            CollectionSlot::Partitions => ChildSlot::Partitions,
            CollectionSlot::Members => ChildSlot::Members,
            CollectionSlot::Coverage => ChildSlot::Coverage,
        }
    }

    /// Collection slot for a tree child slot
    pub fn from_child_slot(slot: ChildSlot) -> Self {
        match slot {
            ChildSlot::Tables => CollectionSlot::Tables,
            ChildSlot::DataSources => CollectionSlot::DataSources,
            ChildSlot::Roles => CollectionSlot::Roles,
            ChildSlot::Partitions => CollectionSlot::Partitions,
            ChildSlot::Members => CollectionSlot::Members,
            ChildSlot::Coverage => CollectionSlot::Coverage,
        }
    }

    /// Display name, used in undo action summaries
    pub fn display_name(self) -> &'static str {
        match self {
            CollectionSlot::Tables => "Tables",
            CollectionSlot::DataSources => "Data Sources",
            CollectionSlot::Roles => "Roles",
            CollectionSlot::Partitions => "Partitions",
            CollectionSlot::Members => "Members",
            CollectionSlot::Coverage => "Coverage",
        }
    }
}

/// One wrapper object
///
/// Exclusively owns a reference to exactly one metadata node at a time.
/// While attached (`removed == false`) the registry maps the node back to
/// this wrapper; while detached the wrapper survives only because undo
/// actions still reference it.
#[derive(Debug)]
pub struct WrapperObject {
    pub(crate) id: ObjectId,
    pub(crate) kind: ObjectKind,
    pub(crate) node: NodeId,
    pub(crate) removed: bool,
    pub(crate) parent: Option<(ObjectId, CollectionSlot)>,
    /// Wrappers of owned descendant nodes, captured by `remove_references`
    /// in subtree walk order; consumed by `reinit` after a restore.
    pub(crate) detached_children: Vec<ObjectId>,
    /// Lazily-built dependency set for expression-bearing kinds
    pub(crate) deps: Option<DependsOnList>,
    /// Bumped on every edit of the expression property
    pub(crate) expr_version: u64,
}

impl WrapperObject {
    pub(crate) fn new(
        id: ObjectId,
        kind: ObjectKind,
        node: NodeId,
        parent: Option<(ObjectId, CollectionSlot)>,
    ) -> Self {
        Self {
            id,
            kind,
            node,
            removed: false,
            parent,
            detached_children: Vec::new(),
            deps: None,
            expr_version: 0,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// The metadata node this wrapper currently owns
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// The owning collection, as (owner object, slot)
    pub fn parent(&self) -> Option<(ObjectId, CollectionSlot)> {
        self.parent
    }
}
