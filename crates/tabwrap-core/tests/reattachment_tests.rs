/// Restore cycles mint fresh node identities; wrappers and references must
/// come back valid anyway.
mod common;

use common::{doc_with_table, first_data_source, COVERAGE_LEVEL};
use tabwrap_core::ops::{model_ops, partition_ops};
use tabwrap_core::{CollectionSlot, Document, Property, TabwrapError, Value};

fn doc_with_coverage() -> (Document, tabwrap_core::ObjectId, tabwrap_core::ObjectId) {
    let mut doc = Document::new(COVERAGE_LEVEL);
    let table = model_ops::add_table(&mut doc, Some("Sales")).expect("Should create table");
    let partition =
        partition_ops::add_partition(&mut doc, table, Some("P2")).expect("Should create partition");
    (doc, table, partition)
}

#[test]
fn test_coverage_definition_requires_compatibility_level() {
    let (mut doc, _, partition) = doc_with_table("Sales");
    assert!(matches!(
        partition_ops::add_coverage_definition(&mut doc, partition),
        Err(TabwrapError::CompatibilityLevelTooLow { required: 1603, actual: 1500 })
    ));
}

#[test]
fn test_coverage_definition_is_reused() {
    let (mut doc, _, partition) = doc_with_coverage();
    let first = partition_ops::add_coverage_definition(&mut doc, partition).unwrap();
    let second = partition_ops::add_coverage_definition(&mut doc, partition).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_nested_wrapper_survives_delete_undo_cycle() {
    // GIVEN a partition with a coverage definition
    let (mut doc, _, partition) = doc_with_coverage();
    let coverage = partition_ops::add_coverage_definition(&mut doc, partition).unwrap();
    doc.set_property(coverage, Property::Expression, Value::text("year >= 2020"))
        .unwrap();
    let old_node = doc.object(coverage).unwrap().node();

    // WHEN deleting the partition and undoing
    doc.delete(partition).unwrap();
    assert!(doc.object(coverage).unwrap().is_removed());
    assert_eq!(doc.lookup(old_node), None);

    doc.undo().unwrap();

    // THEN the nested wrapper is attached again, bound to the restored
    // node, with its value intact
    assert!(!doc.object(coverage).unwrap().is_removed());
    assert_eq!(
        doc.get_property(partition, Property::CoverageDefinition).unwrap(),
        Value::Object(coverage)
    );
    let new_node = doc.object(coverage).unwrap().node();
    assert_eq!(doc.lookup(new_node), Some(coverage));
    assert_eq!(
        doc.get_property(coverage, Property::Expression).unwrap(),
        Value::text("year >= 2020")
    );

    // AND the wrapper is editable, not just readable
    doc.set_property(coverage, Property::Expression, Value::text("year >= 2021"))
        .unwrap();
    doc.verify_consistency().unwrap();
}

#[test]
fn test_restored_node_identity_is_fresh() {
    let (mut doc, _, partition) = doc_with_coverage();
    let old_node = doc.object(partition).unwrap().node();

    doc.delete(partition).unwrap();
    doc.undo().unwrap();

    // Same wrapper, different node
    let new_node = doc.object(partition).unwrap().node();
    assert_ne!(old_node, new_node);
    assert_eq!(doc.lookup(new_node), Some(partition));
    assert_eq!(doc.lookup(old_node), None);
}

#[test]
fn test_data_source_reference_survives_source_undelete() {
    // GIVEN a partition linked to a data source
    let (mut doc, _, partition) = doc_with_table("Sales");
    let source = first_data_source(&doc);
    assert_eq!(
        doc.get_property(partition, Property::DataSource).unwrap(),
        Value::Object(source)
    );

    // WHEN the data source is deleted, the reference dangles and reads as
    // unset rather than failing
    doc.delete(source).unwrap();
    assert_eq!(doc.get_property(partition, Property::DataSource).unwrap(), Value::None);

    // AND undoing rebinds the reference to the restored node
    doc.undo().unwrap();
    assert_eq!(
        doc.get_property(partition, Property::DataSource).unwrap(),
        Value::Object(source)
    );
    doc.verify_consistency().unwrap();
}

#[test]
fn test_snapshot_reference_follows_reminted_identity() {
    // GIVEN a deleted partition whose snapshot captured the data source's
    // node identity
    let (mut doc, table, _) = doc_with_table("Sales");
    let p2 = partition_ops::add_partition(&mut doc, table, Some("P2")).unwrap();
    let source = first_data_source(&doc);
    doc.delete(p2).unwrap();

    // WHEN the data source is deleted and undeleted before the partition
    // comes back, so the captured identity no longer exists
    doc.delete(source).unwrap();
    doc.undo().unwrap();
    doc.undo().unwrap();

    // THEN the restored partition points at the data source's current node
    assert_eq!(
        doc.get_property(p2, Property::DataSource).unwrap(),
        Value::Object(source)
    );
    doc.verify_consistency().unwrap();
}

#[test]
fn test_snapshot_reference_follows_chain_of_reminted_identities() {
    // The referenced node is re-minted twice before the holder is restored
    let (mut doc, table, _) = doc_with_table("Sales");
    let p2 = partition_ops::add_partition(&mut doc, table, Some("P2")).unwrap();
    let source = first_data_source(&doc);

    doc.delete(p2).unwrap();
    doc.delete(source).unwrap();
    doc.undo().unwrap();
    doc.redo().unwrap();
    doc.undo().unwrap();
    doc.undo().unwrap();

    assert_eq!(
        doc.get_property(p2, Property::DataSource).unwrap(),
        Value::Object(source)
    );
    assert_eq!(
        doc.get_property(p2, Property::Name).unwrap(),
        Value::text("P2")
    );
    doc.verify_consistency().unwrap();
}

#[test]
fn test_coverage_definition_round_trip_through_clear() {
    // Clearing the partition collection detaches coverage definitions two
    // levels deep; undo must re-pair them positionally.
    let (mut doc, table, p2) = doc_with_coverage();
    let coverage = partition_ops::add_coverage_definition(&mut doc, p2).unwrap();
    doc.set_property(coverage, Property::Expression, Value::text("region = \"EU\""))
        .unwrap();

    doc.clear_collection(table, CollectionSlot::Partitions).unwrap();
    assert!(doc.object(coverage).unwrap().is_removed());

    doc.undo().unwrap();
    assert_eq!(
        doc.get_property(p2, Property::CoverageDefinition).unwrap(),
        Value::Object(coverage)
    );
    assert_eq!(
        doc.get_property(coverage, Property::Expression).unwrap(),
        Value::text("region = \"EU\"")
    );
    doc.verify_consistency().unwrap();
}
