use tabular_relationships::{
    CommandSink, FullName, InMemoryModel, Materialization, ModelCommand, ModelSnapshot,
    ModelSource, ReferenceRecord, RelationshipDefinition, RelationshipError, RelationshipPair,
    TableInfo,
};

fn sales_products() -> RelationshipPair {
    RelationshipPair::new(
        FullName::new("Products", "ProductId"),
        FullName::new("Sales", "ProductId"),
    )
}

fn build_model() -> InMemoryModel {
    let mut snapshot = ModelSnapshot::new();
    snapshot.tables.push(TableInfo::new("Sales"));
    snapshot.tables.push(TableInfo::new("Products"));
    InMemoryModel::new(snapshot)
}

#[test]
fn edits_become_visible_only_after_commit() {
    let mut model = build_model();
    model
        .add_relationship(RelationshipDefinition::new(sales_products()))
        .unwrap();

    assert!(model.snapshot().unwrap().relationships.is_empty());
    assert!(model.has_pending_changes());

    model.commit().unwrap();
    assert_eq!(model.snapshot().unwrap().relationships.len(), 1);
    assert_eq!(model.commit_count(), 1);
    assert!(!model.has_pending_changes());
}

#[test]
fn references_are_keyed_by_table_and_relationship() {
    let mut model = build_model();
    let record = ReferenceRecord::regular(sales_products());
    model.add_reference(record.clone()).unwrap();

    let err = model.add_reference(record.clone()).unwrap_err();
    assert!(matches!(err, RelationshipError::External(_)));

    let demoted = ReferenceRecord {
        materialization: Materialization::Indirect,
        via: Some(sales_products()),
        ..record
    };
    model.update_reference(demoted.clone()).unwrap();
    model.commit().unwrap();

    let snapshot = model.snapshot().unwrap();
    assert_eq!(snapshot.reference("SALES", &sales_products()), Some(&demoted));
    assert!(!snapshot.is_active(&sales_products()));
}

#[test]
fn removing_missing_records_fails() {
    let mut model = build_model();

    assert!(matches!(
        model.remove_reference("Sales", &sales_products()),
        Err(RelationshipError::External(_))
    ));
    assert!(matches!(
        model.update_reference(ReferenceRecord::regular(sales_products())),
        Err(RelationshipError::External(_))
    ));
    assert_eq!(
        model.remove_relationship(&sales_products()).unwrap_err(),
        RelationshipError::RelationshipNotFound(sales_products())
    );
}

#[test]
fn unknown_tables_are_rejected() {
    let mut model = build_model();
    let pair = RelationshipPair::new(
        FullName::new("Regions", "RegionId"),
        FullName::new("Sales", "RegionId"),
    );

    assert_eq!(
        model
            .add_relationship(RelationshipDefinition::new(pair.clone()))
            .unwrap_err(),
        RelationshipError::UnknownTable("Regions".into())
    );
    assert_eq!(
        model
            .add_reference(ReferenceRecord::indirect("Customers", pair.clone(), pair))
            .unwrap_err(),
        RelationshipError::UnknownTable("Customers".into())
    );
}

#[test]
fn commands_are_recorded_and_replayable() {
    let mut model = build_model();
    model
        .add_relationship(RelationshipDefinition::new(sales_products()))
        .unwrap();
    model
        .add_reference(ReferenceRecord::regular(sales_products()))
        .unwrap();
    model.commit().unwrap();

    let commands = model.take_commands();
    assert_eq!(commands.len(), 3);
    assert!(model.commands().is_empty());

    let mut replica = build_model();
    for command in commands {
        command.apply(&mut replica).unwrap();
    }
    assert_eq!(replica.committed(), model.committed());
}

#[test]
fn rollback_discards_staged_edits() {
    let mut model = build_model();
    model
        .add_relationship(RelationshipDefinition::new(sales_products()))
        .unwrap();
    model.rollback().unwrap();
    model.commit().unwrap();

    assert!(model.snapshot().unwrap().relationships.is_empty());
    assert_eq!(
        &model.commands()[1..],
        &[ModelCommand::Rollback, ModelCommand::Commit]
    );
}
