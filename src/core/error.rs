use thiserror::Error;

use crate::state::EntityKind;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("Permanent processing failure (status {status}): {message}")]
    Permanent { status: u16, message: String },

    #[error("Retryable processing failure (status {status}): {message}")]
    Retryable { status: u16, message: String },

    #[error("Unrecoverable failure ({error_type}): {details}")]
    Unrecoverable { error_type: String, details: String },

    #[error("Transport failure (status {status}): {message}")]
    Transport { status: u16, message: String },

    #[error("{kind} deletion not supported in record migration")]
    EntityDeletionUnsupported { kind: EntityKind },

    #[error("Missing required field(s): {}", fields.join(", "))]
    MissingRequiredFields { fields: Vec<String> },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Transaction cancelled by conditional check: {message}")]
    TransactionConflict { message: String },

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Malformed message body: {0}")]
    MalformedBody(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid item: {0}")]
    InvalidItem(String),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

impl MigrationError {
    /// Whether the queue should redeliver the message that hit this error.
    ///
    /// Derived from the classification taxonomy: only rate-limited and
    /// retryable failures go back on the queue. Domain policy violations
    /// (unsupported deletion, missing fields) never do.
    pub fn should_requeue(&self) -> bool {
        crate::classify::classify_migration_error(self)
            .kind
            .should_redeliver()
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_is_never_requeued() {
        let err = MigrationError::EntityDeletionUnsupported {
            kind: EntityKind::Organisation,
        };
        assert!(!err.should_requeue());
    }

    #[test]
    fn test_missing_fields_message_lists_every_field() {
        let err = MigrationError::MissingRequiredFields {
            fields: vec!["record_id".into(), "method".into()],
        };
        assert_eq!(
            err.to_string(),
            "Missing required field(s): record_id, method"
        );
        assert!(!err.should_requeue());
    }

    #[test]
    fn test_transport_errors_requeue_by_status() {
        let retryable = MigrationError::Transport {
            status: 503,
            message: "service unavailable".into(),
        };
        assert!(retryable.should_requeue());

        let permanent = MigrationError::Transport {
            status: 404,
            message: "not found".into(),
        };
        assert!(!permanent.should_requeue());
    }
}
