//! Model-level creation operations: tables, data sources, roles

use tabwrap_tree::{Field, FieldValue};

use super::{partition_ops, with_update};
use crate::document::Document;
use crate::errors::Result;
use crate::model::{CollectionSlot, ObjectId, ObjectKind, Property, Value};

/// Create a new data source on the model
///
/// The requested name is suffixed (`"Name 2"`, ...) if already taken.
pub fn add_data_source(doc: &mut Document, name: Option<&str>) -> Result<ObjectId> {
    let model = doc.model();
    let name = doc.unique_name(
        model,
        CollectionSlot::DataSources,
        name.unwrap_or("New Data Source"),
    )?;
    doc.create_object(
        ObjectKind::DataSource,
        model,
        CollectionSlot::DataSources,
        vec![(Field::Name, FieldValue::Text(name.clone()))],
        format!("Create data source '{name}'"),
    )
}

/// Create a new table with its initial partition
///
/// A table must always have at least one partition, so the initial
/// partition is created in the same transaction.
pub fn add_table(doc: &mut Document, name: Option<&str>) -> Result<ObjectId> {
    let model = doc.model();
    let name = doc.unique_name(model, CollectionSlot::Tables, name.unwrap_or("New Table"))?;
    with_update(doc, "New table", |doc| {
        let table = doc.create_object(
            ObjectKind::Table,
            model,
            CollectionSlot::Tables,
            vec![(Field::Name, FieldValue::Text(name.clone()))],
            format!("Create table '{name}'"),
        )?;
        partition_ops::add_partition(doc, table, None)?;
        Ok(table)
    })
}

/// Create a new role on the model
pub fn add_role(doc: &mut Document, name: Option<&str>) -> Result<ObjectId> {
    let model = doc.model();
    let name = doc.unique_name(model, CollectionSlot::Roles, name.unwrap_or("New Role"))?;
    doc.create_object(
        ObjectKind::Role,
        model,
        CollectionSlot::Roles,
        vec![(Field::Name, FieldValue::Text(name.clone()))],
        format!("Create role '{name}'"),
    )
}

/// Rename an object through its name property
pub fn rename(doc: &mut Document, id: ObjectId, name: &str) -> Result<()> {
    let property = doc
        .object(id)?
        .kind()
        .name_property()
        .unwrap_or(Property::Name);
    doc.set_property(id, property, Value::text(name))
}
