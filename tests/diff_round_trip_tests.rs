/// Diff round-trip tests
///
/// Applying the converter's output back onto the old snapshot must
/// reproduce the new snapshot for scalar, nested-map and list-element
/// changes. Run with: cargo test --test diff_round_trip_tests
use migratekv::diff::{diff_values, DiffConverter};
use migratekv::Value;

fn round_trip(old: serde_json::Value, new: serde_json::Value) {
    let old = Value::from_json(&old);
    let new = Value::from_json(&new);

    let changes = diff_values(&old, &new);
    let expressions = DiffConverter::convert(&changes);

    let mut patched = old.clone();
    expressions.apply_to(&mut patched).unwrap();
    assert_eq!(patched, new, "expressions: {}", expressions.update_expression());
}

#[test]
fn test_scalar_change_round_trip() {
    round_trip(
        serde_json::json!({ "id": "1", "name": "Old", "active": true }),
        serde_json::json!({ "id": "1", "name": "New", "active": false }),
    );
}

#[test]
fn test_nested_map_round_trip() {
    round_trip(
        serde_json::json!({ "telecom": { "phone_public": "0117 000", "web": "a.example" } }),
        serde_json::json!({ "telecom": { "phone_public": "0117 111", "web": "a.example" } }),
    );
}

#[test]
fn test_list_element_round_trip() {
    round_trip(
        serde_json::json!({ "dispositions": ["DX01", "DX02", "DX03"] }),
        serde_json::json!({ "dispositions": ["DX01", "DX99", "DX03"] }),
    );
}

#[test]
fn test_list_growth_round_trip() {
    round_trip(
        serde_json::json!({ "endpoints": [{ "id": "e1", "order": 1 }] }),
        serde_json::json!({ "endpoints": [{ "id": "e1", "order": 1 }, { "id": "e2", "order": 2 }] }),
    );
}

#[test]
fn test_list_shrink_round_trip() {
    round_trip(
        serde_json::json!({ "endpoints": [{ "id": "e1" }, { "id": "e2" }] }),
        serde_json::json!({ "endpoints": [{ "id": "e1" }] }),
    );
}

#[test]
fn test_field_added_and_removed_round_trip() {
    round_trip(
        serde_json::json!({ "id": "1", "fax": "0117 999" }),
        serde_json::json!({ "id": "1", "website": "example.org" }),
    );
}

#[test]
fn test_nested_list_element_field_round_trip() {
    round_trip(
        serde_json::json!({ "endpoints": [{ "id": "e1", "status": "active" }] }),
        serde_json::json!({ "endpoints": [{ "id": "e1", "status": "retired" }] }),
    );
}

#[test]
fn test_placeholder_numbering_is_stable_across_runs() {
    let old = Value::from_json(&serde_json::json!({
        "name": "Old",
        "address": { "postcode": "BS1 1AA" },
        "capacity": 10,
    }));
    let new = Value::from_json(&serde_json::json!({
        "name": "New",
        "address": { "postcode": "BS2 2BB" },
        "capacity": 20,
    }));

    let first = DiffConverter::convert(&diff_values(&old, &new));
    let second = DiffConverter::convert(&diff_values(&old, &new));

    assert_eq!(first, second);
    // Path-sorted emission: address.postcode < capacity < name
    assert_eq!(
        first.update_expression(),
        "SET #attr_address.#postcode = :val_0, #capacity = :val_1, #attr_name = :val_2"
    );
}
