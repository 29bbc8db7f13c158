use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque node identity, issued by the arena
///
/// Identity is the durable handle for a live node: two nodes are "the same"
/// exactly when their ids are equal. Restoring a snapshot mints new ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    pub(crate) fn fresh() -> Self {
        NodeId(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared kind of a metadata node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Document root
    Model,
    Table,
    /// Legacy partition populated by a query against a data source
    Partition,
    /// Partition populated by a Power Query expression
    MPartition,
    /// Hint describing the data covered by a partition
    CoverageDefinition,
    DataSource,
    Role,
    RoleMember,
}

/// Engine-defined fields, validated per node kind
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Field {
    Name,
    Description,
    /// Query text of a legacy partition
    Query,
    /// Expression text of an M partition or coverage definition
    Expression,
    /// Storage mode (import, directQuery, dual)
    Mode,
    /// Non-owning reference to a data source node
    DataSource,
    ConnectionString,
    RefreshedTime,
    MemberName,
    MemberId,
    IdentityProvider,
}

/// Field values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    /// Non-owning reference to another node
    Reference(NodeId),
    Timestamp(DateTime<Utc>),
}

/// Named child-list slots, validated per node kind
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ChildSlot {
    Tables,
    DataSources,
    Roles,
    Partitions,
    Members,
    /// Optional coverage definition of a partition (at most one member)
    Coverage,
}

/// One node in the metadata tree
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) fields: BTreeMap<Field, FieldValue>,
    pub(crate) children: BTreeMap<ChildSlot, Vec<NodeId>>,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            fields: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }
}

/// Fields each node kind supports
pub(crate) fn supports_field(kind: NodeKind, field: Field) -> bool {
    use Field::*;
    use NodeKind::*;
    match kind {
        Model => false,
        Table => matches!(field, Name | Description),
        Partition => matches!(
            field,
            Name | Description | Query | Mode | Field::DataSource | RefreshedTime
        ),
        MPartition => matches!(field, Name | Description | Expression | Mode | RefreshedTime),
        CoverageDefinition => matches!(field, Expression),
        NodeKind::DataSource => matches!(field, Name | ConnectionString),
        Role => matches!(field, Name | Description),
        RoleMember => matches!(field, MemberName | MemberId | IdentityProvider),
    }
}

/// Child slots each node kind supports
pub(crate) fn supports_slot(kind: NodeKind, slot: ChildSlot) -> bool {
    use ChildSlot::*;
    use NodeKind::*;
    match kind {
        Model => matches!(slot, Tables | DataSources | Roles),
        Table => matches!(slot, Partitions),
        Partition | MPartition => matches!(slot, Coverage),
        Role => matches!(slot, Members),
        CoverageDefinition | NodeKind::DataSource | RoleMember => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_support_tables() {
        assert!(supports_field(NodeKind::Partition, Field::Query));
        assert!(!supports_field(NodeKind::Partition, Field::Expression));
        assert!(supports_field(NodeKind::MPartition, Field::Expression));
        assert!(!supports_field(NodeKind::MPartition, Field::DataSource));
        assert!(!supports_field(NodeKind::Model, Field::Name));
    }

    #[test]
    fn test_slot_support_tables() {
        assert!(supports_slot(NodeKind::Model, ChildSlot::Tables));
        assert!(supports_slot(NodeKind::Table, ChildSlot::Partitions));
        assert!(supports_slot(NodeKind::Partition, ChildSlot::Coverage));
        assert!(!supports_slot(NodeKind::RoleMember, ChildSlot::Members));
    }

    #[test]
    fn test_fresh_ids_are_unique() {
        assert_ne!(NodeId::fresh(), NodeId::fresh());
    }
}
