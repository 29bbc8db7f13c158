/// Document construction, naming, and the property capability surface.
mod common;

use common::{doc_with_table, member_names, BASE_LEVEL};
use tabwrap_core::ops::{model_ops, partition_ops, role_ops};
use tabwrap_core::{CollectionSlot, Document, ObjectKind, Property, TabwrapError, Value};
use tabwrap_tree::{ChildSlot, Field, FieldValue, MetadataTree, NodeKind};

#[test]
fn test_from_tree_wraps_existing_nodes() {
    // GIVEN a pre-populated tree
    let mut tree = MetadataTree::new();
    let model = tree.create_node(NodeKind::Model);
    let table = tree.create_node(NodeKind::Table);
    let partition = tree.create_node(NodeKind::Partition);
    tree.set_field(table, Field::Name, FieldValue::Text("Inventory".into())).unwrap();
    tree.set_field(partition, Field::Name, FieldValue::Text("Full load".into())).unwrap();
    tree.add_child(model, ChildSlot::Tables, table, None).unwrap();
    tree.add_child(table, ChildSlot::Partitions, partition, None).unwrap();

    // WHEN opening a document over it
    let doc = Document::from_tree(tree, BASE_LEVEL).unwrap();

    // THEN every node got a wrapper and a registry entry
    let tables = doc.members(doc.model(), CollectionSlot::Tables).unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(doc.name(tables[0]).unwrap().as_deref(), Some("Inventory"));
    assert_eq!(doc.object(tables[0]).unwrap().kind(), ObjectKind::Table);
    assert_eq!(
        member_names(&doc, tables[0], CollectionSlot::Partitions),
        vec!["Full load"]
    );
    assert_eq!(doc.lookup(doc.object(tables[0]).unwrap().node()), Some(tables[0]));
    assert!(!doc.can_undo());
    doc.verify_consistency().unwrap();
}

#[test]
fn test_from_tree_requires_exactly_one_model_root() {
    let empty = MetadataTree::new();
    assert!(matches!(
        Document::from_tree(empty, BASE_LEVEL),
        Err(TabwrapError::ConsistencyViolation { .. })
    ));

    let mut two_roots = MetadataTree::new();
    two_roots.create_node(NodeKind::Model);
    two_roots.create_node(NodeKind::Model);
    assert!(matches!(
        Document::from_tree(two_roots, BASE_LEVEL),
        Err(TabwrapError::ConsistencyViolation { .. })
    ));
}

#[test]
fn test_duplicate_names_get_suffixed() {
    let mut doc = common::new_doc();
    model_ops::add_table(&mut doc, Some("Sales")).unwrap();
    model_ops::add_table(&mut doc, Some("Sales")).unwrap();
    model_ops::add_table(&mut doc, Some("Sales")).unwrap();

    assert_eq!(
        member_names(&doc, doc.model(), CollectionSlot::Tables),
        vec!["Sales", "Sales 2", "Sales 3"]
    );
}

#[test]
fn test_default_names_per_kind() {
    let mut doc = common::new_doc();
    let table = model_ops::add_table(&mut doc, None).unwrap();
    let role = model_ops::add_role(&mut doc, None).unwrap();

    assert_eq!(doc.name(table).unwrap().as_deref(), Some("New Table"));
    assert_eq!(doc.name(role).unwrap().as_deref(), Some("New Role"));
    assert_eq!(
        member_names(&doc, doc.model(), CollectionSlot::DataSources),
        vec!["New Data Source"]
    );
}

#[test]
fn test_model_carries_no_name() {
    let doc = common::new_doc();
    assert_eq!(doc.name(doc.model()).unwrap(), None);
}

#[test]
fn test_refreshed_time_is_set_and_read_only() {
    let (mut doc, _, partition) = doc_with_table("Sales");

    assert!(doc.refreshed_time(partition).unwrap().is_some());
    assert!(matches!(
        doc.set_property(partition, Property::RefreshedTime, Value::None),
        Err(TabwrapError::ReadOnlyProperty { .. })
    ));
}

#[test]
fn test_capability_surface_per_kind() {
    let (mut doc, table, partition) = doc_with_table("Sales");
    let m = partition_ops::add_m_partition(&mut doc, table, Some("M1")).unwrap();

    assert!(doc.is_browsable(partition, Property::Query).unwrap());
    assert!(doc.is_editable(partition, Property::Query).unwrap());
    assert!(!doc.is_browsable(partition, Property::Expression).unwrap());
    assert!(doc.is_browsable(m, Property::Expression).unwrap());
    assert!(!doc.is_browsable(m, Property::DataSource).unwrap());

    // Coverage definitions are hidden below their compatibility level
    assert!(!doc.is_browsable(partition, Property::CoverageDefinition).unwrap());

    assert!(doc.is_browsable(partition, Property::RefreshedTime).unwrap());
    assert!(!doc.is_editable(partition, Property::RefreshedTime).unwrap());
}

#[test]
fn test_unsupported_property_rejected() {
    let (mut doc, table, _) = doc_with_table("Sales");
    assert!(matches!(
        doc.set_property(table, Property::Query, Value::text("SELECT 1")),
        Err(TabwrapError::UnsupportedProperty { .. })
    ));
    assert!(matches!(
        doc.get_property(table, Property::ConnectionString),
        Err(TabwrapError::UnsupportedProperty { .. })
    ));
}

#[test]
fn test_data_source_property_validates_target() {
    let (mut doc, table, partition) = doc_with_table("Sales");

    // Only data source wrappers are accepted as the target
    assert!(matches!(
        doc.set_property(partition, Property::DataSource, Value::Object(table)),
        Err(TabwrapError::WrongKind { .. })
    ));
    // And only reference-shaped values
    assert!(matches!(
        doc.set_property(partition, Property::DataSource, Value::text("nope")),
        Err(TabwrapError::InvalidValue { .. })
    ));

    // Unsetting is allowed
    doc.set_property(partition, Property::DataSource, Value::None).unwrap();
    assert_eq!(doc.get_property(partition, Property::DataSource).unwrap(), Value::None);
}

#[test]
fn test_ops_validate_owner_kind() {
    let (mut doc, _, partition) = doc_with_table("Sales");
    assert!(matches!(
        partition_ops::add_partition(&mut doc, partition, None),
        Err(TabwrapError::WrongKind { .. })
    ));
    assert!(matches!(
        role_ops::add_role_member(&mut doc, partition, "alice", None, None),
        Err(TabwrapError::WrongKind { .. })
    ));
}

#[test]
fn test_unknown_object_id_errors() {
    let (doc, _, _) = doc_with_table("Sales");
    let (other, _, _) = doc_with_table("Other");
    let foreign = other.model();
    assert!(matches!(
        doc.object(foreign),
        Err(TabwrapError::ObjectNotFound { .. })
    ));
}
