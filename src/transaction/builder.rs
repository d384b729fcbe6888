// ============================================================================
// Transaction Builder
// ============================================================================
//
// Composes entity writes plus exactly one migration-state write into a
// single atomic commit. The builder performs no I/O: it assembles items and
// conditions; the caller submits them through a `MigrationStore`, which
// fails the whole set if any condition does not hold.
//
// ============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::MigrationConfig;
use crate::core::{MigrationError, Result, Value};
use crate::diff::{diff_snapshots, DiffConverter, UpdateExpressions};
use crate::logref::LogRef;
use crate::state::{EntityKind, EntitySnapshot, MigrationState};
use crate::transaction::item::{
    ItemKey, TransactionItem, WriteCondition, DISCRIMINATOR_DOCUMENT, DISCRIMINATOR_FIELD,
};
use crate::transaction::operation::{self, Operation, SkipReason};

#[derive(Debug)]
pub struct TransactionBuilder {
    config: Arc<MigrationConfig>,
    state: MigrationState,
    items: Vec<TransactionItem>,
    current_time: DateTime<Utc>,
}

impl TransactionBuilder {
    /// Start a transaction for one source record.
    ///
    /// The pre-loaded state, when present, is deep-copied: concurrent
    /// builders must never share mutable state. Absent state means nothing
    /// has been migrated yet for this record.
    pub fn new(
        record_id: i64,
        config: Arc<MigrationConfig>,
        state: Option<&MigrationState>,
    ) -> Self {
        Self {
            config,
            state: state
                .cloned()
                .unwrap_or_else(|| MigrationState::create(record_id)),
            items: Vec::new(),
            current_time: Utc::now(),
        }
    }

    /// Pin the commit timestamp used in audit assignments.
    pub fn with_current_time(mut self, current_time: DateTime<Utc>) -> Self {
        self.current_time = current_time;
        self
    }

    pub fn state(&self) -> &MigrationState {
        &self.state
    }

    pub fn version(&self) -> u64 {
        self.state.version
    }

    /// Add an entity write to the transaction.
    ///
    /// `None` with no prior value is a no-op; `None` against a previously
    /// migrated entity fails; deletion is an unsupported operation, not a
    /// silent skip. A snapshot structurally equal to the stored one is a
    /// no-op, which is what makes replays of at-least-once deliveries safe.
    pub fn add_entity(
        &mut self,
        kind: EntityKind,
        snapshot: Option<EntitySnapshot>,
    ) -> Result<&mut Self> {
        let Some(snapshot) = snapshot else {
            if self.state.snapshot(kind).is_some() {
                warn!(
                    code = %LogRef::EntityDeletionRejected,
                    entity = %kind,
                    source_record_id = %self.state.source_record_id,
                    "deletion of a previously migrated entity is not supported",
                );
                return Err(MigrationError::EntityDeletionUnsupported { kind });
            }

            debug!(code = %LogRef::EntityInsertSkipped, entity = %kind, "nothing to add");
            return Ok(self);
        };

        enum Plan {
            Skip(SkipReason),
            Insert,
            Update(Vec<crate::diff::Change>),
        }

        let plan = match operation::decide(self.state.snapshot(kind), Some(&snapshot)) {
            Operation::Skip(reason) => Plan::Skip(reason),
            Operation::Insert(_) => Plan::Insert,
            Operation::Update { previous, current } => {
                Plan::Update(diff_snapshots(previous, current))
            }
            // decide() only rejects when the new snapshot is absent
            Operation::Reject(_) => {
                return Err(MigrationError::EntityDeletionUnsupported { kind });
            }
        };

        match plan {
            Plan::Skip(SkipReason::NothingToAdd) => {
                debug!(code = %LogRef::EntityInsertSkipped, entity = %kind, "nothing to add");
            }
            Plan::Skip(SkipReason::NoChanges) => {
                info!(
                    code = %LogRef::EntityUpdateSkipped,
                    entity = %kind,
                    "no changes detected - update skipped",
                );
            }
            Plan::Insert => self.push_insert(kind, snapshot),
            Plan::Update(changes) => self.push_update(kind, snapshot, changes),
        }

        Ok(self)
    }

    fn push_insert(&mut self, kind: EntityKind, snapshot: EntitySnapshot) {
        let mut item = snapshot.value().clone();
        if let Some(map) = item.as_map_mut() {
            map.insert(
                DISCRIMINATOR_FIELD.to_string(),
                Value::string(DISCRIMINATOR_DOCUMENT),
            );
        }

        self.items.push(TransactionItem::Insert {
            table: self.config.table_name(kind),
            item,
            condition: WriteCondition::KeyAbsent,
        });

        info!(
            code = %LogRef::EntityInsertAdded,
            entity = %kind,
            entity_id = snapshot.id(),
            "added entity insert to transaction",
        );
        self.state.record_entity(kind, snapshot);
    }

    fn push_update(
        &mut self,
        kind: EntityKind,
        snapshot: EntitySnapshot,
        changes: Vec<crate::diff::Change>,
    ) {
        if changes.is_empty() {
            // Snapshots differed only in audit fields the diff excludes
            info!(
                code = %LogRef::EntityUpdateSkipped,
                entity = %kind,
                "no changes detected - update skipped",
            );
            return;
        }

        let mut expressions = DiffConverter::convert(&changes);
        if expressions.is_empty() {
            return;
        }
        expressions.append_audit(&self.current_time.to_rfc3339(), &self.config.migrated_by);

        self.items.push(TransactionItem::Update {
            table: self.config.table_name(kind),
            key: ItemKey::entity(snapshot.id()),
            expressions,
            condition: None,
        });

        info!(
            code = %LogRef::EntityUpdateAdded,
            entity = %kind,
            entity_id = snapshot.id(),
            change_count = changes.len(),
            "changes detected - added entity update to transaction",
        );
        self.state.record_entity(kind, snapshot);
    }

    /// Finalise the transaction.
    ///
    /// Appends exactly one migration-state write when any entity produced an
    /// item, and advances the builder's own version to the value being
    /// committed. The caller re-reads state on a commit conflict.
    pub fn build(&mut self) -> Vec<TransactionItem> {
        if self.items.is_empty() {
            info!(
                code = %LogRef::EmptyTransaction,
                source_record_id = %self.state.source_record_id,
                "no items - skipping state record",
            );
            return Vec::new();
        }

        if self.state.version == 0 {
            self.state.version = 1;
            self.items.push(TransactionItem::Insert {
                table: self.config.state_table_name(),
                item: self.state.to_item(),
                condition: WriteCondition::StateAbsent,
            });

            info!(
                code = %LogRef::StateInsertAdded,
                source_record_id = %self.state.source_record_id,
                version = self.state.version,
                "added migration state insert to transaction",
            );
        } else {
            let expected = self.state.version;
            self.state.version += 1;
            self.items.push(TransactionItem::Update {
                table: self.config.state_table_name(),
                key: ItemKey::state(&self.state.source_record_id),
                expressions: self.state_update_expressions(),
                condition: Some(WriteCondition::VersionMatches(expected)),
            });

            info!(
                code = %LogRef::StateUpdateAdded,
                source_record_id = %self.state.source_record_id,
                new_version = self.state.version,
                "added migration state update to transaction",
            );
        }

        std::mem::take(&mut self.items)
    }

    /// SET the version and every recorded entity reference on the state
    /// record. Placeholders are field-named rather than numbered; numbering
    /// is a diff-conversion concern.
    fn state_update_expressions(&self) -> UpdateExpressions {
        let mut expressions = UpdateExpressions::default();

        let alias = expressions.register_name("version");
        expressions.push_assignment(alias, ":version", Value::number(self.state.version));

        for kind in EntityKind::ALL {
            if let Some(id) = self.state.entity_id(kind) {
                let alias = expressions.register_name(kind.id_field());
                let placeholder = format!(":{}", kind.id_field());
                expressions.push_assignment(alias, &placeholder, Value::string(id));
            }
            if let Some(snapshot) = self.state.snapshot(kind) {
                let alias = expressions.register_name(kind.snapshot_field());
                let placeholder = format!(":{}", kind.snapshot_field());
                expressions.push_assignment(alias, &placeholder, snapshot.value().clone());
            }
        }

        expressions
    }
}
