use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::core::{MigrationError, Result};

/// A value in the target store's data model.
///
/// Maps are backed by `BTreeMap` so that iteration order is deterministic.
/// The structural diff walks maps in key order and the update-expression
/// placeholder numbering depends on that order being stable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOL",
            Self::Number(_) => "N",
            Self::String(_) => "S",
            Self::List(_) => "L",
            Self::Map(_) => "M",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn number(n: u64) -> Self {
        Self::Number(serde_json::Number::from(n))
    }

    /// Convert from plain JSON. Map keys are re-sorted into `BTreeMap` order.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => Self::Number(n.clone()),
            JsonValue::String(s) => Self::String(s.clone()),
            JsonValue::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            JsonValue::Object(fields) => Self::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert back to plain JSON.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => JsonValue::Number(n.clone()),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Render in the store's tagged attribute-value encoding.
    ///
    /// Every value carries its wire type: `{"S": ...}`, `{"N": "..."}`,
    /// `{"BOOL": ...}`, `{"NULL": true}`, `{"L": [...]}`, `{"M": {...}}`.
    /// Numbers travel as strings, as the store requires.
    pub fn to_wire(&self) -> JsonValue {
        match self {
            Self::Null => serde_json::json!({ "NULL": true }),
            Self::Bool(b) => serde_json::json!({ "BOOL": b }),
            Self::Number(n) => serde_json::json!({ "N": n.to_string() }),
            Self::String(s) => serde_json::json!({ "S": s }),
            Self::List(items) => {
                JsonValue::Object(std::iter::once(("L".to_string(), JsonValue::Array(items.iter().map(Self::to_wire).collect()))).collect())
            }
            Self::Map(fields) => {
                let inner: serde_json::Map<String, JsonValue> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect();
                JsonValue::Object(std::iter::once(("M".to_string(), JsonValue::Object(inner))).collect())
            }
        }
    }

    /// Parse a value from the tagged attribute-value encoding.
    pub fn from_wire(wire: &JsonValue) -> Result<Self> {
        let obj = wire.as_object().ok_or_else(|| {
            MigrationError::InvalidItem(format!("expected tagged attribute value, got {wire}"))
        })?;

        let (tag, inner) = obj.iter().next().ok_or_else(|| {
            MigrationError::InvalidItem("empty attribute value".to_string())
        })?;

        match (tag.as_str(), inner) {
            ("NULL", _) => Ok(Self::Null),
            ("BOOL", JsonValue::Bool(b)) => Ok(Self::Bool(*b)),
            ("N", JsonValue::String(s)) => s
                .parse::<serde_json::Number>()
                .map(Self::Number)
                .map_err(|_| MigrationError::InvalidItem(format!("invalid number: {s}"))),
            ("S", JsonValue::String(s)) => Ok(Self::String(s.clone())),
            ("L", JsonValue::Array(items)) => items
                .iter()
                .map(Self::from_wire)
                .collect::<Result<Vec<_>>>()
                .map(Self::List),
            ("M", JsonValue::Object(fields)) => fields
                .iter()
                .map(|(k, v)| Ok((k.clone(), Self::from_wire(v)?)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Self::Map),
            _ => Err(MigrationError::InvalidItem(format!(
                "unknown attribute value tag '{tag}'"
            ))),
        }
    }
}
