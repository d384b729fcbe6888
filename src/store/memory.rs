// ============================================================================
// In-Memory Store
// ============================================================================
//
// Reference implementation of the store port: honors the same conditional
// all-or-nothing commit semantics as the production store, over plain maps.
// Used by tests and local runs, and doubles as executable documentation of
// the store contract.
//
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::MigrationConfig;
use crate::core::{MigrationError, Result, Value};
use crate::state::MigrationState;
use crate::store::MigrationStore;
use crate::transaction::{ItemKey, TransactionItem, WriteCondition};

type Table = HashMap<String, Value>;

pub struct InMemoryStore {
    config: Arc<MigrationConfig>,
    tables: RwLock<HashMap<String, Table>>,
}

impl InMemoryStore {
    pub fn new(config: Arc<MigrationConfig>) -> Self {
        Self {
            config,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch a stored item, for assertions.
    pub async fn item(&self, table: &str, key: &ItemKey) -> Option<Value> {
        let tables = self.tables.read().await;
        tables.get(table)?.get(&key_string(key)).cloned()
    }

    pub async fn item_count(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(table).map_or(0, Table::len)
    }

    /// Key attributes for items of the given table.
    fn key_fields(&self, table: &str) -> &'static [&'static str] {
        if table == self.config.state_table_name() {
            &["source_record_id"]
        } else {
            &["id", "field"]
        }
    }

    fn item_key(&self, table: &str, item: &Value) -> Result<String> {
        let fields = item.as_map().ok_or_else(|| {
            MigrationError::InvalidItem("stored items must be maps".to_string())
        })?;

        let mut parts = Vec::new();
        for name in self.key_fields(table) {
            let value = fields.get(*name).and_then(Value::as_str).ok_or_else(|| {
                MigrationError::InvalidItem(format!("item missing key attribute '{name}'"))
            })?;
            parts.push(value.to_string());
        }

        Ok(parts.join("|"))
    }

    fn check_condition(
        condition: WriteCondition,
        table: &str,
        existing: Option<&Value>,
    ) -> Result<()> {
        let holds = match condition {
            WriteCondition::KeyAbsent | WriteCondition::StateAbsent => existing.is_none(),
            WriteCondition::VersionMatches(expected) => existing
                .and_then(|item| item.as_map())
                .and_then(|fields| fields.get("version"))
                .and_then(Value::as_u64)
                .is_some_and(|version| version == expected),
        };

        if holds {
            Ok(())
        } else {
            Err(MigrationError::TransactionConflict {
                message: format!("conditional check failed for table '{table}'"),
            })
        }
    }
}

#[async_trait]
impl MigrationStore for InMemoryStore {
    async fn load_state(&self, source_record_id: &str) -> Result<Option<MigrationState>> {
        let tables = self.tables.read().await;
        let state_table = self.config.state_table_name();

        match tables.get(&state_table).and_then(|t| t.get(source_record_id)) {
            Some(item) => Ok(Some(MigrationState::from_item(item)?)),
            None => Ok(None),
        }
    }

    async fn commit(&self, items: &[TransactionItem]) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Every condition is evaluated against the pre-transaction state;
        // writes are staged on a copy so a failure applies nothing.
        for item in items {
            let (table, key, condition) = match item {
                TransactionItem::Insert {
                    table,
                    item,
                    condition,
                } => (table, self.item_key(table, item)?, Some(*condition)),
                TransactionItem::Update {
                    table,
                    key,
                    condition,
                    ..
                } => (table, key_string(key), *condition),
            };

            let existing = tables.get(table).and_then(|t| t.get(&key));
            if let Some(condition) = condition {
                Self::check_condition(condition, table, existing)?;
            }
        }

        let mut staged = tables.clone();
        for item in items {
            match item {
                TransactionItem::Insert { table, item, .. } => {
                    let key = self.item_key(table, item)?;
                    staged.entry(table.clone()).or_default().insert(key, item.clone());
                }
                TransactionItem::Update {
                    table,
                    key,
                    expressions,
                    ..
                } => {
                    let target = staged
                        .entry(table.clone())
                        .or_default()
                        .entry(key_string(key))
                        .or_insert_with(|| {
                            // Updates upsert: seed the item with its key attributes
                            Value::Map(
                                key.0
                                    .iter()
                                    .map(|(name, value)| (name.clone(), value.clone()))
                                    .collect(),
                            )
                        });
                    expressions.apply_to(target)?;
                }
            }
        }

        *tables = staged;
        Ok(())
    }
}

fn key_string(key: &ItemKey) -> String {
    key.0
        .iter()
        .map(|(_, value)| value.as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>()
        .join("|")
}
