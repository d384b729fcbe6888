// ============================================================================
// Record Migrator
// ============================================================================
//
// Drives one record through the transaction builder: resolve existing state
// with a consistent read, assemble the atomic item set, commit, and account
// for the outcome. A conditional-check conflict is treated as "someone else
// already migrated this": logged and returned as a normal outcome rather
// than raised or retried.
//
// ============================================================================

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::MigrationConfig;
use crate::core::{MigrationError, Result};
use crate::logref::LogRef;
use crate::state::{EntityKind, EntitySnapshot, MigrationState};
use crate::store::MigrationStore;
use crate::transaction::TransactionBuilder;

/// One source record's already-transformed entity snapshots. Produced by the
/// external schema-transformation collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationRequest {
    pub record_id: i64,
    pub organisation: Option<EntitySnapshot>,
    pub location: Option<EntitySnapshot>,
    pub healthcare_service: Option<EntitySnapshot>,
}

impl MigrationRequest {
    pub fn new(record_id: i64) -> Self {
        Self {
            record_id,
            ..Default::default()
        }
    }

    pub fn snapshot(&self, kind: EntityKind) -> Option<&EntitySnapshot> {
        match kind {
            EntityKind::Organisation => self.organisation.as_ref(),
            EntityKind::Location => self.location.as_ref(),
            EntityKind::HealthcareService => self.healthcare_service.as_ref(),
        }
    }
}

/// How one record's migration concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The transaction committed; the state record now holds this version.
    Committed { version: u64, item_count: usize },
    /// Nothing differed from what is already stored.
    NoChanges,
    /// A concurrent writer got there first; the commit was rejected by a
    /// conditional check and deliberately not retried.
    AlreadyMigrated,
}

/// Running totals for one processor, reset per batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationMetrics {
    pub total: u64,
    pub migrated: u64,
    pub skipped: u64,
    pub conflicts: u64,
    pub errors: u64,
}

impl MigrationMetrics {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct RecordMigrator<S> {
    config: Arc<MigrationConfig>,
    store: Arc<S>,
    metrics: Mutex<MigrationMetrics>,
}

impl<S: MigrationStore> RecordMigrator<S> {
    pub fn new(config: Arc<MigrationConfig>, store: Arc<S>) -> Self {
        Self {
            config,
            store,
            metrics: Mutex::new(MigrationMetrics::default()),
        }
    }

    pub async fn metrics(&self) -> MigrationMetrics {
        self.metrics.lock().await.clone()
    }

    pub async fn reset_metrics(&self) {
        self.metrics.lock().await.reset();
    }

    /// Migrate one record to completion.
    pub async fn migrate(&self, request: &MigrationRequest) -> Result<MigrationOutcome> {
        self.metrics.lock().await.total += 1;

        info!(
            code = %LogRef::RecordStart,
            record_id = request.record_id,
            "starting record migration",
        );

        let outcome = self.migrate_inner(request).await;
        let mut metrics = self.metrics.lock().await;

        match &outcome {
            Ok(MigrationOutcome::Committed { version, item_count }) => {
                metrics.migrated += 1;
                info!(
                    code = %LogRef::RecordMigrated,
                    record_id = request.record_id,
                    version,
                    item_count,
                    "record migrated",
                );
            }
            Ok(MigrationOutcome::NoChanges) => metrics.skipped += 1,
            Ok(MigrationOutcome::AlreadyMigrated) => metrics.conflicts += 1,
            Err(cause) => {
                metrics.errors += 1;
                error!(
                    code = %LogRef::RecordFailed,
                    record_id = request.record_id,
                    error = %cause,
                    "record migration failed",
                );
            }
        }

        outcome
    }

    async fn migrate_inner(&self, request: &MigrationRequest) -> Result<MigrationOutcome> {
        let source_record_id = MigrationState::source_record_id_for(request.record_id);
        let state = self.resolve_state(&source_record_id).await?;

        let mut builder =
            TransactionBuilder::new(request.record_id, Arc::clone(&self.config), state.as_ref());
        for kind in EntityKind::ALL {
            builder.add_entity(kind, request.snapshot(kind).cloned())?;
        }

        let items = builder.build();
        if items.is_empty() {
            return Ok(MigrationOutcome::NoChanges);
        }

        debug!(
            code = %LogRef::CommitExecuting,
            source_record_id = %source_record_id,
            item_count = items.len(),
            "executing transaction",
        );

        match self.store.commit(&items).await {
            Ok(()) => {
                info!(
                    code = %LogRef::CommitSucceeded,
                    source_record_id = %source_record_id,
                    item_count = items.len(),
                    version = builder.version(),
                    "transaction committed",
                );
                Ok(MigrationOutcome::Committed {
                    version: builder.version(),
                    item_count: items.len(),
                })
            }
            Err(MigrationError::TransactionConflict { message }) => {
                // A concurrent writer already migrated this record. Consumed
                // as a benign race; the record's next delivery reconciles
                // any divergence. Flagged in DESIGN.md.
                warn!(
                    code = %LogRef::CommitConflict,
                    source_record_id = %source_record_id,
                    error = %message,
                    "transaction cancelled by conditional check - record already migrated",
                );
                Ok(MigrationOutcome::AlreadyMigrated)
            }
            Err(cause) => {
                error!(
                    code = %LogRef::CommitFailed,
                    source_record_id = %source_record_id,
                    error = %cause,
                    "transaction failed",
                );
                Err(cause)
            }
        }
    }

    async fn resolve_state(&self, source_record_id: &str) -> Result<Option<MigrationState>> {
        let state = self.store.load_state(source_record_id).await?;

        match &state {
            Some(state) => info!(
                code = %LogRef::StateFound,
                source_record_id = %source_record_id,
                version = state.version,
                "existing state found - proceeding with incremental migration",
            ),
            None => info!(
                code = %LogRef::StateNotFound,
                source_record_id = %source_record_id,
                "no existing state found - proceeding with initial migration",
            ),
        }

        Ok(state)
    }
}
