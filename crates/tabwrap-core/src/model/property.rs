use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tabwrap_tree::Field;

use crate::model::ObjectId;

/// Closed set of wrapper-facing properties
///
/// Which properties a given object kind carries, and whether they are
/// currently browsable/editable, is decided by the capability tables in
/// `rules::capabilities`. The mapping to tree fields lives in the document's
/// property machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    Name,
    Description,
    /// Query text of a legacy partition
    Query,
    /// Expression text of an M partition or coverage definition
    Expression,
    /// Storage mode
    Mode,
    /// Reference to the data source used by a legacy partition
    DataSource,
    /// Reference to the optional coverage definition of a partition
    CoverageDefinition,
    ConnectionString,
    /// Read-only last-processed timestamp
    RefreshedTime,
    MemberName,
    MemberId,
    IdentityProvider,
}

impl Property {
    /// The tree field a scalar property maps to
    ///
    /// Reference-valued properties (`DataSource`, `CoverageDefinition`) are
    /// resolved through the registry instead and return `None` here for
    /// `CoverageDefinition`, which is backed by a child slot rather than a
    /// field.
    pub(crate) fn field(self) -> Option<Field> {
        match self {
            Property::Name => Some(Field::Name),
            Property::Description => Some(Field::Description),
            Property::Query => Some(Field::Query),
            Property::Expression => Some(Field::Expression),
            Property::Mode => Some(Field::Mode),
            Property::DataSource => Some(Field::DataSource),
            Property::CoverageDefinition => None,
            Property::ConnectionString => Some(Field::ConnectionString),
            Property::RefreshedTime => Some(Field::RefreshedTime),
            Property::MemberName => Some(Field::MemberName),
            Property::MemberId => Some(Field::MemberId),
            Property::IdentityProvider => Some(Field::IdentityProvider),
        }
    }

    /// Display name, used in undo action summaries
    pub fn display_name(self) -> &'static str {
        match self {
            Property::Name => "Name",
            Property::Description => "Description",
            Property::Query => "Query",
            Property::Expression => "Expression",
            Property::Mode => "Mode",
            Property::DataSource => "Data Source",
            Property::CoverageDefinition => "Coverage Definition",
            Property::ConnectionString => "Connection String",
            Property::RefreshedTime => "Last Processed",
            Property::MemberName => "Member Name",
            Property::MemberId => "Member ID",
            Property::IdentityProvider => "Identity Provider",
        }
    }
}

/// Property values
///
/// References to other wrapped entities are carried as wrapper identities,
/// which stay stable across delete/undelete cycles of the referenced object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    /// Reference to another wrapper object
    Object(ObjectId),
    Timestamp(DateTime<Utc>),
    /// Unset
    None,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// The text payload, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The referenced object, if this is a reference value
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }
}
