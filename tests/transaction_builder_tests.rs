/// Transaction builder tests
///
/// Covers the insert/update/skip/reject decisions, the migration state
/// record appended by build(), and the idempotent-replay guarantees.
/// Run with: cargo test --test transaction_builder_tests
use std::sync::Arc;

use migratekv::state::{EntityKind, EntitySnapshot, MigrationState};
use migratekv::transaction::{TransactionBuilder, TransactionItem, WriteCondition};
use migratekv::{MigrationConfig, MigrationError, Value};

fn config() -> Arc<MigrationConfig> {
    Arc::new(MigrationConfig::new("test"))
}

fn org(name: &str) -> EntitySnapshot {
    EntitySnapshot::from_json(&serde_json::json!({
        "id": "org-1",
        "name": name,
        "active": true,
    }))
    .unwrap()
}

fn location(postcode: &str) -> EntitySnapshot {
    EntitySnapshot::from_json(&serde_json::json!({
        "id": "loc-1",
        "postcode": postcode,
    }))
    .unwrap()
}

#[test]
fn test_fresh_record_inserts_entity_and_state() {
    // Scenario A: fresh source record, one organisation
    let mut builder = TransactionBuilder::new(123, config(), None);
    builder
        .add_entity(EntityKind::Organisation, Some(org("Practice")))
        .unwrap();

    let items = builder.build();
    assert_eq!(items.len(), 2);

    match &items[0] {
        TransactionItem::Insert {
            table, condition, ..
        } => {
            assert_eq!(table, "migration-test-database-organisation");
            assert_eq!(*condition, WriteCondition::KeyAbsent);
        }
        other => panic!("expected entity insert, got {other:?}"),
    }

    match &items[1] {
        TransactionItem::Insert {
            table,
            item,
            condition,
        } => {
            assert_eq!(table, "migration-test-database-migration-state");
            assert_eq!(*condition, WriteCondition::StateAbsent);

            let fields = item.as_map().unwrap();
            assert_eq!(fields["source_record_id"].as_str(), Some("services#123"));
            assert_eq!(fields["version"].as_u64(), Some(1));
        }
        other => panic!("expected state insert, got {other:?}"),
    }

    assert_eq!(builder.version(), 1);
}

#[test]
fn test_existing_state_updates_entity_and_state() {
    // Scenario B: existing state at version 5, changed location
    let mut state = MigrationState::create(123);
    state.version = 5;
    state.record_entity(EntityKind::Location, location("BS1 1AA"));

    let mut builder = TransactionBuilder::new(123, config(), Some(&state));
    builder
        .add_entity(EntityKind::Location, Some(location("BS2 2BB")))
        .unwrap();

    let items = builder.build();
    assert_eq!(items.len(), 2);

    match &items[0] {
        TransactionItem::Update {
            table, condition, ..
        } => {
            assert_eq!(table, "migration-test-database-location");
            assert!(condition.is_none());
        }
        other => panic!("expected entity update, got {other:?}"),
    }

    match &items[1] {
        TransactionItem::Update {
            table,
            condition,
            expressions,
            ..
        } => {
            assert_eq!(table, "migration-test-database-migration-state");
            assert_eq!(*condition, Some(WriteCondition::VersionMatches(5)));
            assert_eq!(expressions.attribute_values[":version"], Value::number(6));
        }
        other => panic!("expected state update, got {other:?}"),
    }

    assert_eq!(builder.version(), 6);
}

#[test]
fn test_single_field_change_produces_minimal_expression() {
    // Scenario C: only `name` changes on an existing organisation
    let mut state = MigrationState::create(1);
    state.version = 1;
    state.record_entity(EntityKind::Organisation, org("Old Name"));

    let mut builder = TransactionBuilder::new(1, config(), Some(&state));
    builder
        .add_entity(EntityKind::Organisation, Some(org("New Name")))
        .unwrap();

    let items = builder.build();
    match &items[0] {
        TransactionItem::Update { expressions, .. } => {
            assert_eq!(
                expressions.update_expression(),
                "SET #attr_name = :val_0, #lastUpdated = :lastUpdated, #lastUpdatedBy = :lastUpdatedBy"
            );

            // Exactly one numbered placeholder beyond the audit pair
            let numbered: Vec<&String> = expressions
                .attribute_values
                .keys()
                .filter(|k| k.starts_with(":val_"))
                .collect();
            assert_eq!(numbered, [":val_0"]);
            assert_eq!(expressions.attribute_values.len(), 3);
            assert_eq!(
                expressions.attribute_values[":val_0"],
                Value::string("New Name")
            );
        }
        other => panic!("expected entity update, got {other:?}"),
    }
}

#[test]
fn test_replay_of_stored_snapshot_is_empty() {
    // Idempotence: the stored snapshot replayed twice adds nothing
    let mut state = MigrationState::create(1);
    state.version = 3;
    state.record_entity(EntityKind::Organisation, org("Same"));

    let mut builder = TransactionBuilder::new(1, config(), Some(&state));
    builder
        .add_entity(EntityKind::Organisation, Some(org("Same")))
        .unwrap();
    builder
        .add_entity(EntityKind::Organisation, Some(org("Same")))
        .unwrap();

    assert!(builder.build().is_empty());
    assert_eq!(builder.version(), 3);
}

#[test]
fn test_deletion_of_migrated_entity_is_rejected() {
    let mut state = MigrationState::create(1);
    state.version = 2;
    state.record_entity(EntityKind::HealthcareService, org("Service"));

    let mut builder = TransactionBuilder::new(1, config(), Some(&state));
    let err = builder
        .add_entity(EntityKind::HealthcareService, None)
        .unwrap_err();

    assert!(matches!(
        err,
        MigrationError::EntityDeletionUnsupported {
            kind: EntityKind::HealthcareService
        }
    ));
    assert!(!err.should_requeue());
}

#[test]
fn test_mixed_insert_and_update_in_one_transaction() {
    // A record that already has an organisation gains a location
    let mut state = MigrationState::create(9);
    state.version = 1;
    state.record_entity(EntityKind::Organisation, org("Practice"));

    let mut builder = TransactionBuilder::new(9, config(), Some(&state));
    builder
        .add_entity(EntityKind::Organisation, Some(org("Practice Renamed")))
        .unwrap()
        .add_entity(EntityKind::Location, Some(location("BS1 1AA")))
        .unwrap();

    let items = builder.build();
    assert_eq!(items.len(), 3);
    assert!(items[0].is_update());
    assert!(items[1].is_insert());

    // The state update now references both entities
    match items.last().unwrap() {
        TransactionItem::Update { expressions, .. } => {
            assert_eq!(
                expressions.attribute_values[":location_id"],
                Value::string("loc-1")
            );
            assert_eq!(
                expressions.attribute_values[":organisation_id"],
                Value::string("org-1")
            );
        }
        other => panic!("expected state update, got {other:?}"),
    }
}

#[test]
fn test_audit_only_difference_adds_nothing() {
    // Snapshots differing only in audit fields are equal for migration
    let stored = EntitySnapshot::from_json(&serde_json::json!({
        "id": "org-1",
        "name": "Same",
        "lastUpdated": "2024-01-01T00:00:00Z",
    }))
    .unwrap();
    let incoming = EntitySnapshot::from_json(&serde_json::json!({
        "id": "org-1",
        "name": "Same",
        "lastUpdated": "2025-06-01T00:00:00Z",
    }))
    .unwrap();

    let mut state = MigrationState::create(1);
    state.version = 1;
    state.record_entity(EntityKind::Organisation, stored);

    let mut builder = TransactionBuilder::new(1, config(), Some(&state));
    builder
        .add_entity(EntityKind::Organisation, Some(incoming))
        .unwrap();

    assert!(builder.build().is_empty());
}
