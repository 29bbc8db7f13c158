//! Role member operations

use tabwrap_tree::{Field, FieldValue};

use crate::document::Document;
use crate::errors::{Result, TabwrapError};
use crate::model::{CollectionSlot, ObjectId, ObjectKind};

/// Create a new member on a role
///
/// `identity_provider` is set for external members and left unset for
/// local ones.
pub fn add_role_member(
    doc: &mut Document,
    role: ObjectId,
    member_name: &str,
    member_id: Option<&str>,
    identity_provider: Option<&str>,
) -> Result<ObjectId> {
    let actual = doc.object(role)?.kind();
    if actual != ObjectKind::Role {
        return Err(TabwrapError::WrongKind {
            object_id: role,
            expected: ObjectKind::Role,
            actual,
        });
    }
    let name = doc.unique_name(role, CollectionSlot::Members, member_name)?;
    let mut fields = vec![(Field::MemberName, FieldValue::Text(name.clone()))];
    if let Some(id) = member_id {
        fields.push((Field::MemberId, FieldValue::Text(id.to_string())));
    }
    if let Some(provider) = identity_provider {
        fields.push((Field::IdentityProvider, FieldValue::Text(provider.to_string())));
    }
    doc.create_object(
        ObjectKind::RoleMember,
        role,
        CollectionSlot::Members,
        fields,
        format!("Create role member '{name}'"),
    )
}
