use tabwrap_core::ops::model_ops;
use tabwrap_core::{CollectionSlot, Document, ObjectId};

/// Compatibility level used by most tests; coverage definitions are not
/// available at this level.
#[allow(dead_code)]
pub const BASE_LEVEL: u32 = 1500;

/// Compatibility level at which coverage definitions are available.
#[allow(dead_code)]
pub const COVERAGE_LEVEL: u32 = 1603;

/// Create an empty document at the base compatibility level
#[allow(dead_code)]
pub fn new_doc() -> Document {
    Document::new(BASE_LEVEL)
}

/// Create a document with one table (and its initial partition)
///
/// Returns (document, table, initial partition). Creating the table also
/// creates the model's first data source and links the partition to it,
/// all as a single "New table" transaction.
#[allow(dead_code)]
pub fn doc_with_table(name: &str) -> (Document, ObjectId, ObjectId) {
    let mut doc = Document::new(BASE_LEVEL);
    let table = model_ops::add_table(&mut doc, Some(name)).expect("Should create table");
    let partition = first_partition(&doc, table);
    (doc, table, partition)
}

/// The first partition of a table
#[allow(dead_code)]
pub fn first_partition(doc: &Document, table: ObjectId) -> ObjectId {
    doc.members(table, CollectionSlot::Partitions)
        .expect("Table should have a partition collection")[0]
}

/// The model's first data source
#[allow(dead_code)]
pub fn first_data_source(doc: &Document) -> ObjectId {
    doc.members(doc.model(), CollectionSlot::DataSources)
        .expect("Model should have a data source collection")[0]
}

/// Names of a collection's members, in order
#[allow(dead_code)]
pub fn member_names(doc: &Document, owner: ObjectId, slot: CollectionSlot) -> Vec<String> {
    doc.members(owner, slot)
        .expect("Collection should be readable")
        .into_iter()
        .map(|m| doc.name(m).expect("Member should be readable").unwrap_or_default())
        .collect()
}
