//! Browsable/editable capability tables
//!
//! Keyed by (object kind, property) with the compatibility level as the
//! only extra input. Both predicates are pure and cheap; UI layers call
//! them on every refresh.

use crate::model::{ObjectKind, Property};

/// Compatibility level at which coverage definitions become available
pub const COVERAGE_DEFINITION_MIN_LEVEL: u32 = 1603;

/// Whether a property is shown at all for this kind
pub fn browsable(kind: ObjectKind, property: Property, compatibility_level: u32) -> bool {
    use ObjectKind::*;
    use Property::*;
    match (kind, property) {
        (Table, Name | Description) => true,
        (Partition, Name | Description | Query | Mode | Property::DataSource | RefreshedTime) => {
            true
        }
        (MPartition, Name | Description | Expression | Mode | RefreshedTime) => true,
        (Partition | MPartition, Property::CoverageDefinition) => {
            compatibility_level >= COVERAGE_DEFINITION_MIN_LEVEL
        }
        (ObjectKind::CoverageDefinition, Expression) => true,
        (ObjectKind::DataSource, Name | ConnectionString) => true,
        (Role, Name | Description) => true,
        (RoleMember, MemberName | MemberId | IdentityProvider) => true,
        _ => false,
    }
}

/// Whether a property is mutable right now for this kind
pub fn editable(kind: ObjectKind, property: Property, compatibility_level: u32) -> bool {
    use ObjectKind::*;
    use Property::*;
    match (kind, property) {
        // read-only metadata
        (_, RefreshedTime) => false,
        (Partition | MPartition, Property::CoverageDefinition) => {
            compatibility_level >= COVERAGE_DEFINITION_MIN_LEVEL
        }
        _ => browsable(kind, property, compatibility_level),
    }
}
