// ============================================================================
// Batch Application
// ============================================================================
//
// The lambda-style entry point: takes a delivered batch, runs every message
// through the record migrator, and answers with the partial-batch-failure
// list. Everything upstream of the migrator (body parsing, required-field
// validation, method gating, snapshot mapping) lives here.
//
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::MigrationConfig;
use crate::core::MigrationError;
use crate::logref::LogRef;
use crate::migrate::processor::{MigrationRequest, RecordMigrator};
use crate::queue::{
    validate_required_fields, BatchEvent, BatchResponse, Message, MessageBatchProcessor,
    RecordHandler,
};
use crate::store::MigrationStore;

/// Supported change methods on the source side.
pub const METHOD_INSERT: &str = "insert";
pub const METHOD_UPDATE: &str = "update";

/// A parsed change notification from the source capture stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub record_id: i64,
    pub method: String,
}

/// Maps a change notification to already-transformed entity snapshots.
///
/// The seam to the external schema-transformation collaborator: the engine
/// never interprets entity content itself.
pub trait SnapshotMapper: Send + Sync {
    fn map(
        &self,
        event: &ChangeEvent,
        body: &serde_json::Value,
    ) -> anyhow::Result<MigrationRequest>;
}

impl<F> SnapshotMapper for F
where
    F: Fn(&ChangeEvent, &serde_json::Value) -> anyhow::Result<MigrationRequest> + Send + Sync,
{
    fn map(
        &self,
        event: &ChangeEvent,
        body: &serde_json::Value,
    ) -> anyhow::Result<MigrationRequest> {
        self(event, body)
    }
}

pub struct BatchApplication<S, M> {
    migrator: RecordMigrator<S>,
    processor: MessageBatchProcessor,
    mapper: M,
    run_id: Uuid,
}

impl<S: MigrationStore, M: SnapshotMapper> BatchApplication<S, M> {
    pub fn new(config: Arc<MigrationConfig>, store: Arc<S>, mapper: M) -> Self {
        Self {
            processor: MessageBatchProcessor::new(&config),
            migrator: RecordMigrator::new(config, store),
            mapper,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn migrator(&self) -> &RecordMigrator<S> {
        &self.migrator
    }

    /// Process one delivered batch and report the messages to redeliver.
    pub async fn handle_batch(&self, event: &BatchEvent) -> BatchResponse {
        info!(
            code = %LogRef::BatchReceived,
            run_id = %self.run_id,
            total_records = event.records.len(),
            "handling incoming message batch",
        );

        self.migrator.reset_metrics().await;
        let failures = self.processor.process_batch(&event.records, self).await;
        let metrics = self.migrator.metrics().await;

        info!(
            run_id = %self.run_id,
            total = metrics.total,
            migrated = metrics.migrated,
            skipped = metrics.skipped,
            conflicts = metrics.conflicts,
            errors = metrics.errors,
            "batch metrics",
        );

        BatchResponse::new(failures)
    }

    fn parse_event(&self, message: &Message) -> anyhow::Result<(ChangeEvent, serde_json::Value)> {
        let body: serde_json::Value = serde_json::from_str(&message.body).map_err(|cause| {
            MigrationError::MalformedBody(format!("failed to parse message body: {cause}"))
        })?;

        validate_required_fields(&body, &["record_id", "method"])?;

        let event: ChangeEvent = serde_json::from_value(body.clone())
            .map_err(|cause| MigrationError::MalformedBody(cause.to_string()))?;

        if event.method != METHOD_INSERT && event.method != METHOD_UPDATE {
            warn!(
                message_id = %message.id,
                method = %event.method,
                "unsupported method for record migration",
            );
            return Err(MigrationError::UnsupportedOperation(format!(
                "unsupported method for record migration: {}",
                event.method
            ))
            .into());
        }

        Ok((event, body))
    }
}

#[async_trait]
impl<S: MigrationStore, M: SnapshotMapper> RecordHandler for BatchApplication<S, M> {
    async fn handle(&self, message: &Message) -> anyhow::Result<()> {
        let (event, body) = self.parse_event(message)?;
        let request = self.mapper.map(&event, &body)?;
        self.migrator.migrate(&request).await?;
        Ok(())
    }
}
