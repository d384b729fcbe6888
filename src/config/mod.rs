use std::collections::BTreeMap;

use crate::core::Value;
use crate::state::EntityKind;

const DEFAULT_TABLE_PREFIX: &str = "migration";
const DEFAULT_MAX_RECEIVE_COUNT: u32 = 3;

/// Identity stamped into the `lastUpdatedBy` audit field of every update.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditIdentity {
    /// Actor category, e.g. "app" for automated writers.
    pub kind: String,
    /// Stable actor identifier.
    pub value: String,
    /// Human-readable display name.
    pub display: String,
}

impl AuditIdentity {
    pub fn new(kind: &str, value: &str, display: &str) -> Self {
        Self {
            kind: kind.to_string(),
            value: value.to_string(),
            display: display.to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut fields = BTreeMap::new();
        fields.insert("type".to_string(), Value::string(&self.kind));
        fields.insert("value".to_string(), Value::string(&self.value));
        fields.insert("display".to_string(), Value::string(&self.display));
        Value::Map(fields)
    }
}

impl Default for AuditIdentity {
    fn default() -> Self {
        Self::new("app", "INTERNAL001", "Data Migration")
    }
}

/// Migration engine configuration
///
/// An explicitly constructed handle, passed by `Arc` into the builder,
/// migrator and application. There is no global or lazily initialised
/// configuration anywhere in the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationConfig {
    /// Deployment environment, part of every table name
    pub environment: String,

    /// Optional workspace suffix for ephemeral deployments
    pub workspace: Option<String>,

    /// Table name prefix
    pub table_prefix: String,

    /// The queue infrastructure's maximum delivery count. Used only for
    /// final-attempt observability in logs; it never changes redelivery
    /// behavior.
    pub max_receive_count: u32,

    /// Identity recorded in audit fields on every update
    pub migrated_by: AuditIdentity,
}

impl MigrationConfig {
    pub fn new(environment: &str) -> Self {
        Self {
            environment: environment.to_string(),
            workspace: None,
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            max_receive_count: DEFAULT_MAX_RECEIVE_COUNT,
            migrated_by: AuditIdentity::default(),
        }
    }

    /// Set the workspace suffix
    pub fn workspace(mut self, workspace: &str) -> Self {
        self.workspace = Some(workspace.to_string());
        self
    }

    /// Set the table name prefix
    pub fn table_prefix(mut self, prefix: &str) -> Self {
        self.table_prefix = prefix.to_string();
        self
    }

    /// Set the queue's maximum delivery count (observability only)
    pub fn max_receive_count(mut self, count: u32) -> Self {
        self.max_receive_count = count;
        self
    }

    /// Set the audit identity
    pub fn migrated_by(mut self, identity: AuditIdentity) -> Self {
        self.migrated_by = identity;
        self
    }

    /// Table holding items of the given entity kind.
    pub fn table_name(&self, kind: EntityKind) -> String {
        self.qualified_table(kind.table_suffix())
    }

    /// Table holding migration state records.
    pub fn state_table_name(&self) -> String {
        self.qualified_table("migration-state")
    }

    fn qualified_table(&self, suffix: &str) -> String {
        match &self.workspace {
            Some(ws) => format!(
                "{}-{}-database-{}-{}",
                self.table_prefix, self.environment, suffix, ws
            ),
            None => format!("{}-{}-database-{}", self.table_prefix, self.environment, suffix),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.environment.trim().is_empty() {
            return Err("environment cannot be empty".to_string());
        }

        if self.table_prefix.trim().is_empty() {
            return Err("table_prefix cannot be empty".to_string());
        }

        if self.max_receive_count == 0 {
            return Err("max_receive_count must be > 0".to_string());
        }

        Ok(())
    }

    /// Restore every field except the environment to its default.
    ///
    /// For test harnesses that mutate a shared config between cases.
    /// Production code constructs a fresh config instead.
    pub fn reset(&mut self) {
        let environment = std::mem::take(&mut self.environment);
        *self = Self::new(&environment);
    }
}
