// ============================================================================
// migratekv
// ============================================================================
//
// Transactional record migration engine: moves records from a legacy
// relational source into a multi-entity, versioned key-value store, exactly
// once per logical change, surviving partial failures, duplicate delivery,
// and concurrent writers.
//
// ============================================================================

pub mod classify;
pub mod config;
pub mod core;
pub mod diff;
pub mod logref;
pub mod migrate;
pub mod queue;
pub mod state;
pub mod store;
pub mod transaction;

// Re-export main types for convenience
pub use crate::core::{MigrationError, Result, Value};
pub use classify::{classify, classify_status, ClassifiedError, FailureKind};
pub use config::{AuditIdentity, MigrationConfig};
pub use logref::LogRef;
pub use migrate::{
    BatchApplication, MigrationMetrics, MigrationOutcome, MigrationRequest, RecordMigrator,
    SnapshotMapper,
};
pub use queue::{BatchEvent, BatchResponse, ItemFailure, Message, MessageBatchProcessor};
pub use state::{EntityKind, EntitySnapshot, MigrationState};
pub use store::{InMemoryStore, MigrationStore};
pub use transaction::{TransactionBuilder, TransactionItem, WriteCondition};

// ============================================================================
// High-level usage
// ============================================================================
//
// ```no_run
// use std::sync::Arc;
//
// use migratekv::migrate::ChangeEvent;
// use migratekv::{
//     BatchApplication, BatchEvent, EntitySnapshot, InMemoryStore, MigrationConfig,
//     MigrationRequest,
// };
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let config = Arc::new(MigrationConfig::new("dev"));
//     let store = Arc::new(InMemoryStore::new(Arc::clone(&config)));
//
//     // The mapper is the seam to schema transformation: it turns a change
//     // notification into already-transformed entity snapshots.
//     let mapper = |event: &ChangeEvent, body: &serde_json::Value| {
//         let mut request = MigrationRequest::new(event.record_id);
//         if let Some(org) = body.get("organisation") {
//             request.organisation = Some(EntitySnapshot::from_json(org)?);
//         }
//         Ok(request)
//     };
//
//     let app = BatchApplication::new(config, store, mapper);
//     let event: BatchEvent = serde_json::from_str(r#"{ "records": [] }"#)?;
//     let response = app.handle_batch(&event).await;
//     println!("{} messages to redeliver", response.batch_item_failures.len());
//     Ok(())
// }
// ```
