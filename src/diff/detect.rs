// ============================================================================
// Structural Diff Detection
// ============================================================================
//
// Walks two snapshots depth-first and emits a deterministic, path-sorted
// sequence of tagged changes. Determinism is contractual: the converter
// numbers value placeholders in emission order, and those numbers appear in
// committed update expressions.
//
// ============================================================================

use crate::core::Value;
use crate::diff::change::{Change, DiffPath};
use crate::state::EntitySnapshot;

/// Audit fields maintained by the writer itself, never diffed.
const EXCLUDED_FIELDS: [&str; 4] = ["createdTime", "createdBy", "lastUpdated", "lastUpdatedBy"];

/// Diff two entity snapshots.
///
/// Emission order is depth-first over sorted map keys and ascending list
/// indices, so equivalent inputs always produce the same change sequence.
pub fn diff_snapshots(old: &EntitySnapshot, new: &EntitySnapshot) -> Vec<Change> {
    diff_values(old.value(), new.value())
}

/// Diff two values from the root.
pub fn diff_values(old: &Value, new: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    walk(&DiffPath::root(), old, new, &mut changes);
    changes
}

fn walk(path: &DiffPath, old: &Value, new: &Value, changes: &mut Vec<Change>) {
    if old == new {
        return;
    }

    match (old, new) {
        (Value::Map(old_fields), Value::Map(new_fields)) => {
            // BTreeMap iteration gives sorted keys; chain removals and
            // additions through a sorted union so the emission order is
            // stable regardless of which side a key lives on.
            let mut keys: Vec<&String> = old_fields.keys().chain(new_fields.keys()).collect();
            keys.sort();
            keys.dedup();

            for key in keys {
                if EXCLUDED_FIELDS.contains(&key.as_str()) {
                    continue;
                }

                let child = path.key(key);
                match (old_fields.get(key), new_fields.get(key)) {
                    (Some(old_value), Some(new_value)) => {
                        walk(&child, old_value, new_value, changes)
                    }
                    (None, Some(new_value)) => changes.push(Change::Added {
                        path: child,
                        value: new_value.clone(),
                    }),
                    (Some(_), None) => changes.push(Change::Removed { path: child }),
                    (None, None) => unreachable!("key came from one of the maps"),
                }
            }
        }

        (Value::List(old_items), Value::List(new_items)) => {
            if old_items.len() != new_items.len() {
                // Length-changing edits replace the whole collection: the
                // store rejects overlapping per-index patches against a
                // list whose shape is shifting.
                changes.push(Change::Changed {
                    path: path.clone(),
                    old: old.clone(),
                    new: new.clone(),
                });
                return;
            }

            for (index, (old_item, new_item)) in old_items.iter().zip(new_items).enumerate() {
                if old_item == new_item {
                    continue;
                }

                match (old_item, new_item) {
                    (Value::Map(_), Value::Map(_)) => {
                        walk(&path.index(index), old_item, new_item, changes)
                    }
                    _ => changes.push(Change::ListElementChanged {
                        path: path.clone(),
                        index,
                        old: old_item.clone(),
                        new: new_item.clone(),
                    }),
                }
            }
        }

        _ => changes.push(Change::Changed {
            path: path.clone(),
            old: old.clone(),
            new: new.clone(),
        }),
    }
}
