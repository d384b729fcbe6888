// ============================================================================
// Diff to Update-Expression Conversion
// ============================================================================
//
// Turns a tagged change sequence into the components of a partial-update
// instruction: an ordered SET assignment list, REMOVE paths, and the two
// symbol tables (attribute-name aliases and value placeholders).
//
// ============================================================================

use std::collections::BTreeMap;

use crate::config::AuditIdentity;
use crate::core::{MigrationError, Result, Value};
use crate::diff::change::{Change, DiffPath, PathSegment};

/// Field names the store reserves; they must be accessed through an alias.
pub const RESERVED_WORDS: [&str; 17] = [
    "name", "type", "status", "active", "location", "address", "order", "comment", "value",
    "date", "time", "start", "end", "source", "id", "count", "size",
];

/// Wire field name of the last-modified timestamp audit attribute.
pub const AUDIT_TIMESTAMP_FIELD: &str = "lastUpdated";
/// Wire field name of the last-modified-by audit attribute.
pub const AUDIT_IDENTITY_FIELD: &str = "lastUpdatedBy";

/// One SET assignment: an alias-qualified attribute path and the value
/// placeholder assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub path: String,
    pub placeholder: String,
}

/// Components of a partial-update instruction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateExpressions {
    pub assignments: Vec<Assignment>,
    pub removals: Vec<String>,
    /// Alias name → real field name.
    pub attribute_names: BTreeMap<String, String>,
    /// Placeholder name → wire value.
    pub attribute_values: BTreeMap<String, Value>,
}

impl UpdateExpressions {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty() && self.removals.is_empty()
    }

    /// Alias for a field name: reserved words gain an `attr_` prefix so the
    /// alias never collides with the store's expression grammar.
    pub fn alias_for(name: &str) -> String {
        if RESERVED_WORDS.contains(&name) {
            format!("#attr_{name}")
        } else {
            format!("#{name}")
        }
    }

    /// Register an attribute name, returning its alias.
    pub fn register_name(&mut self, name: &str) -> String {
        let alias = Self::alias_for(name);
        self.attribute_names.insert(alias.clone(), name.to_string());
        alias
    }

    /// Add a SET assignment with an explicitly named placeholder.
    pub fn push_assignment(&mut self, path: String, placeholder: &str, value: Value) {
        self.attribute_values.insert(placeholder.to_string(), value);
        self.assignments.push(Assignment {
            path,
            placeholder: placeholder.to_string(),
        });
    }

    /// The textual update expression: `SET a = :v, … REMOVE x, y`.
    pub fn update_expression(&self) -> String {
        let mut parts = Vec::new();

        if !self.assignments.is_empty() {
            let clauses: Vec<String> = self
                .assignments
                .iter()
                .map(|a| format!("{} = {}", a.path, a.placeholder))
                .collect();
            parts.push(format!("SET {}", clauses.join(", ")));
        }

        if !self.removals.is_empty() {
            parts.push(format!("REMOVE {}", self.removals.join(", ")));
        }

        parts.join(" ")
    }

    /// Append the two audit assignments after every domain assignment.
    pub fn append_audit(&mut self, timestamp: &str, updated_by: &AuditIdentity) {
        let timestamp_alias = self.register_name(AUDIT_TIMESTAMP_FIELD);
        let identity_alias = self.register_name(AUDIT_IDENTITY_FIELD);

        self.push_assignment(
            timestamp_alias,
            ":lastUpdated",
            Value::string(timestamp),
        );
        self.push_assignment(identity_alias, ":lastUpdatedBy", updated_by.to_value());
    }

    /// Re-apply these expressions to an item, resolving aliases and
    /// placeholders through the symbol tables.
    ///
    /// This is the executable meaning of the expressions: the in-memory
    /// store uses it to commit updates, and tests use it to check the
    /// diff round-trip property.
    pub fn apply_to(&self, item: &mut Value) -> Result<()> {
        for assignment in &self.assignments {
            let segments = self.resolve_path(&assignment.path)?;
            let value = self
                .attribute_values
                .get(&assignment.placeholder)
                .ok_or_else(|| {
                    MigrationError::InvalidItem(format!(
                        "no value registered for placeholder {}",
                        assignment.placeholder
                    ))
                })?;
            set_path(item, &segments, value.clone())?;
        }

        for removal in &self.removals {
            let segments = self.resolve_path(removal)?;
            remove_path(item, &segments)?;
        }

        Ok(())
    }

    /// Resolve an alias-qualified path back into concrete segments.
    fn resolve_path(&self, path: &str) -> Result<Vec<PathSegment>> {
        let mut segments = Vec::new();

        for part in path.split('.') {
            let (alias, indices) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            let name = self.attribute_names.get(alias).ok_or_else(|| {
                MigrationError::InvalidItem(format!("unregistered attribute alias {alias}"))
            })?;
            segments.push(PathSegment::Key(name.clone()));

            for index in indices.split_terminator(']') {
                let index = index.trim_start_matches('[').parse::<usize>().map_err(|_| {
                    MigrationError::InvalidItem(format!("invalid index in path {part}"))
                })?;
                segments.push(PathSegment::Index(index));
            }
        }

        Ok(segments)
    }
}

fn set_path(item: &mut Value, segments: &[PathSegment], value: Value) -> Result<()> {
    let (last, parents) = segments.split_last().ok_or_else(|| {
        MigrationError::InvalidItem("empty assignment path".to_string())
    })?;

    let mut current = item;
    for segment in parents {
        current = descend(current, segment)?;
    }

    match last {
        PathSegment::Key(name) => {
            let map = current.as_map_mut().ok_or_else(|| {
                MigrationError::InvalidItem(format!("cannot set field '{name}' on a non-map value"))
            })?;
            map.insert(name.clone(), value);
        }
        PathSegment::Index(index) => match current {
            Value::List(items) if *index < items.len() => items[*index] = value,
            _ => {
                return Err(MigrationError::InvalidItem(format!(
                    "index [{index}] out of bounds for assignment"
                )));
            }
        },
    }

    Ok(())
}

fn remove_path(item: &mut Value, segments: &[PathSegment]) -> Result<()> {
    let (last, parents) = segments.split_last().ok_or_else(|| {
        MigrationError::InvalidItem("empty removal path".to_string())
    })?;

    let mut current = item;
    for segment in parents {
        current = descend(current, segment)?;
    }

    match last {
        PathSegment::Key(name) => {
            if let Some(map) = current.as_map_mut() {
                map.remove(name);
            }
            Ok(())
        }
        PathSegment::Index(_) => Err(MigrationError::InvalidItem(
            "per-index removal is not part of the update grammar".to_string(),
        )),
    }
}

fn descend<'a>(value: &'a mut Value, segment: &PathSegment) -> Result<&'a mut Value> {
    match segment {
        PathSegment::Key(name) => {
            let map = value.as_map_mut().ok_or_else(|| {
                MigrationError::InvalidItem(format!("cannot descend into '{name}' of a non-map"))
            })?;
            Ok(map
                .entry(name.clone())
                .or_insert_with(|| Value::Map(Default::default())))
        }
        PathSegment::Index(index) => match value {
            Value::List(items) if *index < items.len() => Ok(&mut items[*index]),
            _ => Err(MigrationError::InvalidItem(format!(
                "index [{index}] out of bounds while descending"
            ))),
        },
    }
}

/// Converts a tagged change sequence into update expressions.
///
/// Placeholders number sequentially from `:val_0` in emission order; the
/// detector's path-sorted ordering makes the numbering deterministic for
/// equivalent inputs.
pub struct DiffConverter {
    expressions: UpdateExpressions,
    value_counter: usize,
}

impl DiffConverter {
    pub fn convert(changes: &[Change]) -> UpdateExpressions {
        let mut converter = Self {
            expressions: UpdateExpressions::default(),
            value_counter: 0,
        };

        for change in changes {
            converter.apply_change(change);
        }

        converter.expressions
    }

    fn apply_change(&mut self, change: &Change) {
        match change {
            Change::Added { path, value } | Change::Changed { path, new: value, .. } => {
                let rendered = self.render_path(path);
                self.push_numbered(rendered, value.clone());
            }
            Change::ListElementChanged {
                path, index, new, ..
            } => {
                let rendered = format!("{}[{index}]", self.render_path(path));
                self.push_numbered(rendered, new.clone());
            }
            Change::Removed { path } => {
                let rendered = self.render_path(path);
                self.expressions.removals.push(rendered);
            }
        }
    }

    fn push_numbered(&mut self, path: String, value: Value) {
        let placeholder = format!(":val_{}", self.value_counter);
        self.value_counter += 1;
        self.expressions.push_assignment(path, &placeholder, value);
    }

    fn render_path(&mut self, path: &DiffPath) -> String {
        let mut rendered = String::new();

        for segment in path.segments() {
            match segment {
                PathSegment::Key(name) => {
                    if !rendered.is_empty() {
                        rendered.push('.');
                    }
                    rendered.push_str(&self.expressions.register_name(name));
                }
                PathSegment::Index(index) => {
                    rendered.push_str(&format!("[{index}]"));
                }
            }
        }

        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::detect::diff_values;

    fn value(json: serde_json::Value) -> Value {
        Value::from_json(&json)
    }

    #[test]
    fn test_scalar_change_uses_reserved_alias() {
        let old = value(serde_json::json!({ "name": "Old" }));
        let new = value(serde_json::json!({ "name": "New" }));

        let expressions = DiffConverter::convert(&diff_values(&old, &new));
        assert_eq!(expressions.update_expression(), "SET #attr_name = :val_0");
        assert_eq!(expressions.attribute_names["#attr_name"], "name");
        assert_eq!(expressions.attribute_values[":val_0"], Value::string("New"));
    }

    #[test]
    fn test_nested_path_aliases_each_segment() {
        let old = value(serde_json::json!({ "telecom": { "phone_public": "0117 000" } }));
        let new = value(serde_json::json!({ "telecom": { "phone_public": "0117 111" } }));

        let expressions = DiffConverter::convert(&diff_values(&old, &new));
        assert_eq!(
            expressions.update_expression(),
            "SET #telecom.#phone_public = :val_0"
        );
        assert_eq!(expressions.attribute_names["#telecom"], "telecom");
        assert_eq!(expressions.attribute_names["#phone_public"], "phone_public");
    }

    #[test]
    fn test_list_element_change_is_index_qualified() {
        let old = value(serde_json::json!({ "dispositions": ["DX01", "DX02"] }));
        let new = value(serde_json::json!({ "dispositions": ["DX01", "DX03"] }));

        let expressions = DiffConverter::convert(&diff_values(&old, &new));
        assert_eq!(
            expressions.update_expression(),
            "SET #dispositions[1] = :val_0"
        );
    }

    #[test]
    fn test_removed_field_emits_remove_clause() {
        let old = value(serde_json::json!({ "fax": "0117 000", "name": "A" }));
        let new = value(serde_json::json!({ "name": "A" }));

        let expressions = DiffConverter::convert(&diff_values(&old, &new));
        assert_eq!(expressions.update_expression(), "REMOVE #fax");
        assert!(expressions.attribute_values.is_empty());
    }

    #[test]
    fn test_placeholders_number_in_emission_order() {
        let old = value(serde_json::json!({ "a": 1, "b": 1, "c": 1 }));
        let new = value(serde_json::json!({ "a": 2, "b": 2, "c": 2 }));

        let expressions = DiffConverter::convert(&diff_values(&old, &new));
        assert_eq!(
            expressions.update_expression(),
            "SET #a = :val_0, #b = :val_1, #c = :val_2"
        );
    }

    #[test]
    fn test_audit_assignments_come_last() {
        let old = value(serde_json::json!({ "name": "Old" }));
        let new = value(serde_json::json!({ "name": "New" }));

        let mut expressions = DiffConverter::convert(&diff_values(&old, &new));
        expressions.append_audit("2025-08-05T10:00:00+00:00", &AuditIdentity::default());

        assert_eq!(
            expressions.update_expression(),
            "SET #attr_name = :val_0, #lastUpdated = :lastUpdated, #lastUpdatedBy = :lastUpdatedBy"
        );
        assert_eq!(
            expressions.attribute_values[":lastUpdated"],
            Value::string("2025-08-05T10:00:00+00:00")
        );
    }

    #[test]
    fn test_apply_reproduces_new_snapshot() {
        let old = value(serde_json::json!({
            "name": "Old",
            "telecom": { "phone_public": "0117 000", "fax": "0117 999" },
            "dispositions": ["DX01", "DX02"],
        }));
        let new = value(serde_json::json!({
            "name": "New",
            "telecom": { "phone_public": "0117 111" },
            "dispositions": ["DX01", "DX03"],
        }));

        let expressions = DiffConverter::convert(&diff_values(&old, &new));
        let mut patched = old.clone();
        expressions.apply_to(&mut patched).unwrap();
        assert_eq!(patched, new);
    }

    #[test]
    fn test_apply_reproduces_whole_list_replacement() {
        let old = value(serde_json::json!({ "dispositions": ["DX01"] }));
        let new = value(serde_json::json!({ "dispositions": ["DX01", "DX02", "DX03"] }));

        let expressions = DiffConverter::convert(&diff_values(&old, &new));
        let mut patched = old.clone();
        expressions.apply_to(&mut patched).unwrap();
        assert_eq!(patched, new);
    }

    #[test]
    fn test_apply_creates_missing_intermediate_maps() {
        let old = value(serde_json::json!({ "name": "A" }));
        let new = value(serde_json::json!({ "name": "A", "telecom": { "fax": "0117 999" } }));

        let expressions = DiffConverter::convert(&diff_values(&old, &new));
        let mut patched = old.clone();
        expressions.apply_to(&mut patched).unwrap();
        assert_eq!(patched, new);
    }
}
