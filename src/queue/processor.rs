// ============================================================================
// Message Batch Processor
// ============================================================================
//
// Iterates a delivered batch strictly sequentially, invokes the per-record
// handler, and classifies failures to decide what is reported back for
// redelivery versus permanently dropped. The processor never deletes or
// acknowledges messages itself: the returned failure list is its whole
// contract with the queue infrastructure.
//
// ============================================================================

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::classify::{classify, FailureKind};
use crate::config::MigrationConfig;
use crate::core::{MigrationError, Result};
use crate::logref::LogRef;
use crate::queue::message::{ItemFailure, Message};

/// The caller-supplied per-record handler.
#[async_trait]
pub trait RecordHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> anyhow::Result<()>;
}

/// Adapter for plain closures, mostly used by tests and small tools.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> RecordHandler for FnHandler<F>
where
    F: Fn(&Message) -> anyhow::Result<()> + Send + Sync,
{
    async fn handle(&self, message: &Message) -> anyhow::Result<()> {
        (self.0)(message)
    }
}

/// Fail with a permanent, non-requeueable error listing every required field
/// that is absent, null, or an empty string. A numeric `0` is a present
/// value, not "missing".
pub fn validate_required_fields(body: &serde_json::Value, required: &[&str]) -> Result<()> {
    let fields = body.as_object().ok_or_else(|| {
        MigrationError::MalformedBody("message body must be a JSON object".to_string())
    })?;

    let missing: Vec<String> = required
        .iter()
        .filter(|name| {
            match fields.get(**name) {
                None | Some(serde_json::Value::Null) => true,
                Some(serde_json::Value::String(s)) => s.is_empty(),
                Some(_) => false,
            }
        })
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        warn!(
            code = %LogRef::MissingRequiredFields,
            missing = missing.join(", "),
            "message body is missing required fields",
        );
        Err(MigrationError::MissingRequiredFields { fields: missing })
    }
}

pub struct MessageBatchProcessor {
    /// Queue infrastructure's delivery limit; observability only.
    max_receive_count: u32,
}

impl MessageBatchProcessor {
    pub fn new(config: &MigrationConfig) -> Self {
        Self {
            max_receive_count: config.max_receive_count,
        }
    }

    /// Process a batch, returning the messages to redeliver.
    ///
    /// Messages are handled one at a time, each to completion, before the
    /// next starts. A message's `receive_count` never changes the outcome;
    /// only the failure classification does.
    pub async fn process_batch(
        &self,
        messages: &[Message],
        handler: &dyn RecordHandler,
    ) -> Vec<ItemFailure> {
        let mut failures: Vec<ItemFailure> = Vec::new();
        let mut succeeded = 0usize;

        for message in messages {
            info!(
                code = %LogRef::MessageStart,
                message_id = %message.id,
                receive_count = message.receive_count,
                total_records = messages.len(),
                "processing message",
            );

            match handler.handle(message).await {
                Ok(()) => {
                    succeeded += 1;
                    info!(
                        code = %LogRef::MessageSuccess,
                        message_id = %message.id,
                        "message processed successfully",
                    );
                }
                Err(cause) => {
                    let classified = classify(&cause);
                    let final_attempt = message.receive_count >= self.max_receive_count;

                    match classified.kind {
                        FailureKind::Permanent => {
                            warn!(
                                code = %LogRef::MessageConsumedPermanent,
                                message_id = %message.id,
                                status = classified.status,
                                error = %classified.message,
                                "permanent failure - message consumed without redelivery",
                            );
                        }
                        FailureKind::Unrecoverable => {
                            error!(
                                code = %LogRef::MessageConsumedUnrecoverable,
                                message_id = %message.id,
                                status = classified.status,
                                error = %classified.message,
                                "unrecoverable failure - message consumed without redelivery",
                            );
                        }
                        FailureKind::RateLimited => {
                            warn!(
                                code = %LogRef::MessageRedeliverRateLimited,
                                message_id = %message.id,
                                receive_count = message.receive_count,
                                max_receive_count = self.max_receive_count,
                                final_attempt,
                                "rate limited - message reported for redelivery",
                            );
                            failures.push(ItemFailure::new(&message.id));
                        }
                        FailureKind::Retryable => {
                            let code = if classified.status == 0 {
                                LogRef::MessageRedeliverUnclassified
                            } else {
                                LogRef::MessageRedeliverRetryable
                            };
                            warn!(
                                code = %code,
                                message_id = %message.id,
                                status = classified.status,
                                receive_count = message.receive_count,
                                max_receive_count = self.max_receive_count,
                                final_attempt,
                                error = %classified.message,
                                "retryable failure - message reported for redelivery",
                            );
                            failures.push(ItemFailure::new(&message.id));
                        }
                    }
                }
            }
        }

        if !failures.is_empty() {
            warn!(
                code = %LogRef::BatchRetrySummary,
                retry_count = failures.len(),
                total_records = messages.len(),
                "some records could not be processed - reporting failures for redelivery",
            );
        }

        info!(
            code = %LogRef::BatchComplete,
            total_records = messages.len(),
            succeeded,
            failed = messages.len() - succeeded,
            "completed batch",
        );

        failures
    }
}
