use serde_json::Value as JsonValue;

use crate::core::Value;
use crate::diff::UpdateExpressions;

/// Name of the shape-discriminator attribute on entity items. Guards entity
/// inserts against colliding with a differently-shaped item at the same key.
pub const DISCRIMINATOR_FIELD: &str = "field";
/// Discriminator value for full entity documents.
pub const DISCRIMINATOR_DOCUMENT: &str = "document";

/// Primary key of an item being updated.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemKey(pub Vec<(String, Value)>);

impl ItemKey {
    /// Composite entity key: id plus the shape discriminator.
    pub fn entity(id: &str) -> Self {
        Self(vec![
            ("id".to_string(), Value::string(id)),
            (
                DISCRIMINATOR_FIELD.to_string(),
                Value::string(DISCRIMINATOR_DOCUMENT),
            ),
        ])
    }

    /// Migration state key.
    pub fn state(source_record_id: &str) -> Self {
        Self(vec![(
            "source_record_id".to_string(),
            Value::string(source_record_id),
        )])
    }
}

/// Condition attached to a write; the whole transaction fails if any item's
/// condition does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// The entity key must be entirely absent.
    KeyAbsent,
    /// No state record may exist yet for the source record.
    StateAbsent,
    /// The state record must exist at exactly this version.
    VersionMatches(u64),
}

impl WriteCondition {
    /// Rendered condition expression.
    pub fn expression(self) -> String {
        match self {
            Self::KeyAbsent => {
                "attribute_not_exists(id) AND attribute_not_exists(#field)".to_string()
            }
            Self::StateAbsent => "attribute_not_exists(source_record_id)".to_string(),
            Self::VersionMatches(_) => {
                "attribute_exists(source_record_id) AND version = :current_version".to_string()
            }
        }
    }

    pub fn attribute_names(self) -> Vec<(String, String)> {
        match self {
            Self::KeyAbsent => vec![("#field".to_string(), DISCRIMINATOR_FIELD.to_string())],
            _ => Vec::new(),
        }
    }

    pub fn attribute_values(self) -> Vec<(String, Value)> {
        match self {
            Self::VersionMatches(version) => {
                vec![(":current_version".to_string(), Value::number(version))]
            }
            _ => Vec::new(),
        }
    }
}

/// A tagged write within an atomic multi-item commit.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionItem {
    /// Put a full item, guarded by a not-exists condition.
    Insert {
        table: String,
        item: Value,
        condition: WriteCondition,
    },

    /// Apply an update expression to an existing item. Entity updates carry
    /// no condition; the state record's version condition fails the whole
    /// transaction on a concurrent write.
    Update {
        table: String,
        key: ItemKey,
        expressions: UpdateExpressions,
        condition: Option<WriteCondition>,
    },
}

impl TransactionItem {
    pub fn table(&self) -> &str {
        match self {
            Self::Insert { table, .. } => table,
            Self::Update { table, .. } => table,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert { .. })
    }

    pub fn is_update(&self) -> bool {
        matches!(self, Self::Update { .. })
    }

    pub fn condition(&self) -> Option<WriteCondition> {
        match self {
            Self::Insert { condition, .. } => Some(*condition),
            Self::Update { condition, .. } => *condition,
        }
    }

    /// Render in the store's transact-write wire shape, with all values in
    /// the tagged attribute-value encoding.
    pub fn to_wire(&self) -> JsonValue {
        match self {
            Self::Insert {
                table,
                item,
                condition,
            } => {
                let mut put = serde_json::Map::new();
                put.insert("TableName".to_string(), JsonValue::String(table.clone()));
                put.insert("Item".to_string(), item.to_wire()["M"].clone());
                put.insert(
                    "ConditionExpression".to_string(),
                    JsonValue::String(condition.expression()),
                );

                let names = condition.attribute_names();
                if !names.is_empty() {
                    put.insert(
                        "ExpressionAttributeNames".to_string(),
                        names
                            .into_iter()
                            .map(|(k, v)| (k, JsonValue::String(v)))
                            .collect(),
                    );
                }

                serde_json::json!({ "Put": put })
            }

            Self::Update {
                table,
                key,
                expressions,
                condition,
            } => {
                let mut update = serde_json::Map::new();
                update.insert("TableName".to_string(), JsonValue::String(table.clone()));
                update.insert(
                    "Key".to_string(),
                    key.0
                        .iter()
                        .map(|(name, value)| (name.clone(), value.to_wire()))
                        .collect(),
                );
                update.insert(
                    "UpdateExpression".to_string(),
                    JsonValue::String(expressions.update_expression()),
                );

                let mut names: serde_json::Map<String, JsonValue> = expressions
                    .attribute_names
                    .iter()
                    .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                    .collect();
                let mut values: serde_json::Map<String, JsonValue> = expressions
                    .attribute_values
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect();

                if let Some(condition) = condition {
                    update.insert(
                        "ConditionExpression".to_string(),
                        JsonValue::String(condition.expression()),
                    );
                    for (k, v) in condition.attribute_names() {
                        names.insert(k, JsonValue::String(v));
                    }
                    for (k, v) in condition.attribute_values() {
                        values.insert(k, v.to_wire());
                    }
                }

                if !names.is_empty() {
                    update.insert("ExpressionAttributeNames".to_string(), names.into());
                }
                // REMOVE-only updates have no values; the wire rejects empty maps
                if !values.is_empty() {
                    update.insert("ExpressionAttributeValues".to_string(), values.into());
                }

                serde_json::json!({ "Update": update })
            }
        }
    }
}
