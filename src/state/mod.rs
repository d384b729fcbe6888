// ============================================================================
// Migration State
// ============================================================================
//
// The durable record of which entities have already been written for one
// source record, and at what version. A state record exists in the store iff
// at least one entity has been written for that source record.
//
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use crate::core::{MigrationError, Result, Value};

/// Source table the stable record key is derived from.
const SOURCE_TABLE: &str = "services";

/// The entity kinds managed by the migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Organisation,
    Location,
    HealthcareService,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Organisation,
        EntityKind::Location,
        EntityKind::HealthcareService,
    ];

    /// Table name suffix for this kind.
    pub fn table_suffix(self) -> &'static str {
        match self {
            Self::Organisation => "organisation",
            Self::Location => "location",
            Self::HealthcareService => "healthcare-service",
        }
    }

    /// Field name of the id reference in the state record.
    pub fn id_field(self) -> &'static str {
        match self {
            Self::Organisation => "organisation_id",
            Self::Location => "location_id",
            Self::HealthcareService => "healthcare_service_id",
        }
    }

    /// Field name of the cached snapshot in the state record.
    pub fn snapshot_field(self) -> &'static str {
        match self {
            Self::Organisation => "organisation",
            Self::Location => "location",
            Self::HealthcareService => "healthcare_service",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_suffix())
    }
}

/// An opaque domain-entity value, identified by its `id` field.
///
/// The engine never inspects entity schema beyond the id: it only compares
/// snapshots for equality and diffs them structurally.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    value: Value,
}

impl EntitySnapshot {
    /// Wrap a map value carrying a string `id` field.
    pub fn new(value: Value) -> Result<Self> {
        let id_present = value
            .as_map()
            .and_then(|m| m.get("id"))
            .and_then(Value::as_str)
            .is_some();

        if !id_present {
            return Err(MigrationError::InvalidItem(
                "entity snapshot must be a map with a string 'id' field".to_string(),
            ));
        }

        Ok(Self { value })
    }

    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        Self::new(Value::from_json(json))
    }

    pub fn id(&self) -> &str {
        // Checked at construction
        self.value
            .as_map()
            .and_then(|m| m.get("id"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Versioned migration state for one source record.
///
/// `version` starts at 0 and increases by exactly 1 on every successful
/// commit that changed at least one item. `Clone` produces a deep,
/// independent copy; builders always work on a copy so concurrent builders
/// never share mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationState {
    pub source_record_id: String,
    pub version: u64,
    pub organisation_id: Option<String>,
    pub organisation: Option<EntitySnapshot>,
    pub location_id: Option<String>,
    pub location: Option<EntitySnapshot>,
    pub healthcare_service_id: Option<String>,
    pub healthcare_service: Option<EntitySnapshot>,
}

impl MigrationState {
    /// Fresh state for a source record: version 0, no entities written.
    pub fn create(record_id: i64) -> Self {
        Self {
            source_record_id: Self::source_record_id_for(record_id),
            version: 0,
            organisation_id: None,
            organisation: None,
            location_id: None,
            location: None,
            healthcare_service_id: None,
            healthcare_service: None,
        }
    }

    /// Stable string key derived from the legacy numeric id, e.g. "services#123".
    pub fn source_record_id_for(record_id: i64) -> String {
        format!("{SOURCE_TABLE}#{record_id}")
    }

    pub fn entity_id(&self, kind: EntityKind) -> Option<&str> {
        match kind {
            EntityKind::Organisation => self.organisation_id.as_deref(),
            EntityKind::Location => self.location_id.as_deref(),
            EntityKind::HealthcareService => self.healthcare_service_id.as_deref(),
        }
    }

    pub fn snapshot(&self, kind: EntityKind) -> Option<&EntitySnapshot> {
        match kind {
            EntityKind::Organisation => self.organisation.as_ref(),
            EntityKind::Location => self.location.as_ref(),
            EntityKind::HealthcareService => self.healthcare_service.as_ref(),
        }
    }

    /// Record that an entity has been (or is about to be) written: stores
    /// both the id reference and the cached snapshot.
    pub fn record_entity(&mut self, kind: EntityKind, snapshot: EntitySnapshot) {
        let id = snapshot.id().to_string();
        match kind {
            EntityKind::Organisation => {
                self.organisation_id = Some(id);
                self.organisation = Some(snapshot);
            }
            EntityKind::Location => {
                self.location_id = Some(id);
                self.location = Some(snapshot);
            }
            EntityKind::HealthcareService => {
                self.healthcare_service_id = Some(id);
                self.healthcare_service = Some(snapshot);
            }
        }
    }

    /// Serialise to the stored item shape.
    pub fn to_item(&self) -> Value {
        let mut fields = BTreeMap::new();
        fields.insert(
            "source_record_id".to_string(),
            Value::string(&self.source_record_id),
        );
        fields.insert("version".to_string(), Value::number(self.version));

        for kind in EntityKind::ALL {
            if let Some(id) = self.entity_id(kind) {
                fields.insert(kind.id_field().to_string(), Value::string(id));
            }
            if let Some(snapshot) = self.snapshot(kind) {
                fields.insert(kind.snapshot_field().to_string(), snapshot.value().clone());
            }
        }

        Value::Map(fields)
    }

    /// Deserialise from the stored item shape.
    pub fn from_item(item: &Value) -> Result<Self> {
        let fields = item.as_map().ok_or_else(|| {
            MigrationError::InvalidItem("migration state item must be a map".to_string())
        })?;

        let source_record_id = fields
            .get("source_record_id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MigrationError::InvalidItem("migration state item missing source_record_id".to_string())
            })?
            .to_string();

        let version = fields
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                MigrationError::InvalidItem("migration state item missing numeric version".to_string())
            })?;

        let mut state = Self {
            source_record_id,
            version,
            organisation_id: None,
            organisation: None,
            location_id: None,
            location: None,
            healthcare_service_id: None,
            healthcare_service: None,
        };

        for kind in EntityKind::ALL {
            let id = fields
                .get(kind.id_field())
                .and_then(Value::as_str)
                .map(str::to_string);
            let snapshot = match fields.get(kind.snapshot_field()) {
                Some(value) if *value != Value::Null => Some(EntitySnapshot::new(value.clone())?),
                _ => None,
            };

            match kind {
                EntityKind::Organisation => {
                    state.organisation_id = id;
                    state.organisation = snapshot;
                }
                EntityKind::Location => {
                    state.location_id = id;
                    state.location = snapshot;
                }
                EntityKind::HealthcareService => {
                    state.healthcare_service_id = id;
                    state.healthcare_service = snapshot;
                }
            }
        }

        Ok(state)
    }
}
