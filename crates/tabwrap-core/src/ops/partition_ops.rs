//! Partition operations: creation, coverage definitions, kind conversion

use chrono::Utc;

use tabwrap_tree::{Field, FieldValue};

use super::{model_ops, with_update};
use crate::document::Document;
use crate::errors::{Result, TabwrapError};
use crate::model::{CollectionSlot, ObjectId, ObjectKind, Property, Value};
use crate::rules::capabilities::COVERAGE_DEFINITION_MIN_LEVEL;

fn require_kind(doc: &Document, id: ObjectId, expected: ObjectKind) -> Result<()> {
    let actual = doc.object(id)?.kind();
    if actual != expected {
        return Err(TabwrapError::WrongKind {
            object_id: id,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Create a new legacy partition on a table
///
/// A legacy partition needs a data source; if the model has none, one is
/// created in the same transaction and the partition is linked to it.
pub fn add_partition(doc: &mut Document, table: ObjectId, name: Option<&str>) -> Result<ObjectId> {
    require_kind(doc, table, ObjectKind::Table)?;
    let name = doc.unique_name(table, CollectionSlot::Partitions, name.unwrap_or("Partition"))?;
    with_update(doc, "New partition", |doc| {
        let model = doc.model();
        let mut sources = doc.members(model, CollectionSlot::DataSources)?;
        if sources.is_empty() {
            sources.push(model_ops::add_data_source(doc, None)?);
        }
        let partition = doc.create_object(
            ObjectKind::Partition,
            table,
            CollectionSlot::Partitions,
            vec![
                (Field::Name, FieldValue::Text(name.clone())),
                (Field::Mode, FieldValue::Text("import".into())),
                (Field::RefreshedTime, FieldValue::Timestamp(Utc::now())),
            ],
            format!("Create partition '{name}'"),
        )?;
        doc.set_property(partition, Property::DataSource, Value::Object(sources[0]))?;
        Ok(partition)
    })
}

/// Create a new Power Query partition on a table
pub fn add_m_partition(doc: &mut Document, table: ObjectId, name: Option<&str>) -> Result<ObjectId> {
    require_kind(doc, table, ObjectKind::Table)?;
    let name = doc.unique_name(table, CollectionSlot::Partitions, name.unwrap_or("Partition"))?;
    doc.create_object(
        ObjectKind::MPartition,
        table,
        CollectionSlot::Partitions,
        vec![
            (Field::Name, FieldValue::Text(name.clone())),
            (Field::Mode, FieldValue::Text("import".into())),
            (Field::RefreshedTime, FieldValue::Timestamp(Utc::now())),
        ],
        format!("Create M partition '{name}'"),
    )
}

/// Add a coverage definition to a partition, returning the existing one if
/// the partition already has one
///
/// # Errors
/// `CompatibilityLevelTooLow` below the level coverage definitions require.
pub fn add_coverage_definition(doc: &mut Document, partition: ObjectId) -> Result<ObjectId> {
    let kind = doc.object(partition)?.kind();
    if !matches!(kind, ObjectKind::Partition | ObjectKind::MPartition) {
        return Err(TabwrapError::WrongKind {
            object_id: partition,
            expected: ObjectKind::Partition,
            actual: kind,
        });
    }
    if doc.compatibility_level() < COVERAGE_DEFINITION_MIN_LEVEL {
        return Err(TabwrapError::CompatibilityLevelTooLow {
            required: COVERAGE_DEFINITION_MIN_LEVEL,
            actual: doc.compatibility_level(),
        });
    }
    if let Value::Object(existing) = doc.get_property(partition, Property::CoverageDefinition)? {
        return Ok(existing);
    }
    with_update(doc, "Add coverage definition", |doc| {
        doc.create_object(
            ObjectKind::CoverageDefinition,
            partition,
            CollectionSlot::Coverage,
            vec![(Field::Expression, FieldValue::Text(String::new()))],
            "Add coverage definition".to_string(),
        )
    })
}

/// Convert every legacy partition of a table into an M partition
///
/// The two partition kinds have incompatible node shapes, so each member is
/// replaced by a delete-old/create-new pair inside one transaction. Name
/// and expression text are preserved; the query is left as-is and needs to
/// be rewritten as an M expression before the partition can be processed.
pub fn convert_to_power_query(doc: &mut Document, table: ObjectId) -> Result<()> {
    require_kind(doc, table, ObjectKind::Table)?;
    with_update(doc, "Convert partitions", |doc| {
        let legacy: Vec<ObjectId> = doc
            .members(table, CollectionSlot::Partitions)?
            .into_iter()
            .filter(|p| doc.object(*p).is_ok_and(|o| o.kind() == ObjectKind::Partition))
            .collect();
        for old in legacy {
            let old_name = doc.name(old)?.unwrap_or_default();
            let query = doc.get_property(old, Property::Query)?;
            let new = add_m_partition(doc, table, None)?;
            if let Value::Text(text) = query {
                doc.set_property(new, Property::Expression, Value::Text(text))?;
            }
            doc.delete(old)?;
            doc.set_property(new, Property::Name, Value::text(old_name))?;
        }
        Ok(())
    })
}

/// Convert every M partition of a table into a legacy partition
///
/// Each new partition is linked to `provider` when given, otherwise to the
/// model's first data source (created if the model has none). The M
/// expression is carried over as the query text and needs to be rewritten
/// as SQL before the partition can be processed.
pub fn convert_to_legacy(
    doc: &mut Document,
    table: ObjectId,
    provider: Option<ObjectId>,
) -> Result<()> {
    require_kind(doc, table, ObjectKind::Table)?;
    with_update(doc, "Convert partitions", |doc| {
        let m_partitions: Vec<ObjectId> = doc
            .members(table, CollectionSlot::Partitions)?
            .into_iter()
            .filter(|p| doc.object(*p).is_ok_and(|o| o.kind() == ObjectKind::MPartition))
            .collect();
        for old in m_partitions {
            let old_name = doc.name(old)?.unwrap_or_default();
            let expression = doc.get_property(old, Property::Expression)?;
            let new = add_partition(doc, table, None)?;
            if let Some(source) = provider {
                doc.set_property(new, Property::DataSource, Value::Object(source))?;
            }
            if let Value::Text(text) = expression {
                doc.set_property(new, Property::Query, Value::Text(text))?;
            }
            doc.delete(old)?;
            doc.set_property(new, Property::Name, Value::text(old_name))?;
        }
        Ok(())
    })
}
