// ============================================================================
// Error Classification
// ============================================================================
//
// Pure mapping from a raised failure (transport status or opaque error) to
// the fixed four-way taxonomy the batch processor acts on. Classification
// happens exactly once, as close to the failing call as possible.
//
// ============================================================================

use crate::core::MigrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    RateLimited,
    Retryable,
    Permanent,
    Unrecoverable,
}

impl FailureKind {
    /// Whether the message that hit this failure goes back on the queue.
    pub fn should_redeliver(self) -> bool {
        matches!(self, Self::RateLimited | Self::Retryable)
    }
}

/// A classified failure: the taxonomy bucket, the transport status that
/// produced it (0 when no status applies), and a human-readable message.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedError {
    pub kind: FailureKind,
    pub status: u16,
    pub message: String,
}

impl ClassifiedError {
    fn new(kind: FailureKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn should_redeliver(&self) -> bool {
        self.kind.should_redeliver()
    }
}

/// Classify a transport status code.
pub fn classify_status(status: u16, message: impl Into<String>) -> ClassifiedError {
    let kind = match status {
        429 => FailureKind::RateLimited,
        // Malformed payload: redelivery can never succeed
        400 => FailureKind::Unrecoverable,
        401 | 403 | 405 | 406 | 422 => FailureKind::Unrecoverable,
        404 => FailureKind::Permanent,
        408 | 409 | 410 | 412 | 500 | 502 | 503 | 504 => FailureKind::Retryable,
        _ => FailureKind::Unrecoverable,
    };

    ClassifiedError::new(kind, status, message)
}

/// Classify a crate error.
pub fn classify_migration_error(error: &MigrationError) -> ClassifiedError {
    match error {
        MigrationError::RateLimited { message } => {
            ClassifiedError::new(FailureKind::RateLimited, 429, message.clone())
        }
        MigrationError::Permanent { status, message } => {
            ClassifiedError::new(FailureKind::Permanent, *status, message.clone())
        }
        MigrationError::Retryable { status, message } => {
            ClassifiedError::new(FailureKind::Retryable, *status, message.clone())
        }
        MigrationError::Unrecoverable { details, .. } => {
            ClassifiedError::new(FailureKind::Unrecoverable, 0, details.clone())
        }
        MigrationError::Transport { status, message } => classify_status(*status, message.clone()),

        // Domain policy violations: never requeueable
        MigrationError::EntityDeletionUnsupported { .. }
        | MigrationError::MissingRequiredFields { .. }
        | MigrationError::UnsupportedOperation(_) => {
            ClassifiedError::new(FailureKind::Permanent, 0, error.to_string())
        }

        MigrationError::MalformedBody(_) | MigrationError::Serialization(_) => {
            ClassifiedError::new(FailureKind::Unrecoverable, 0, error.to_string())
        }

        // A conflict that escapes the swallow path is worth another attempt
        MigrationError::TransactionConflict { message } => {
            ClassifiedError::new(FailureKind::Retryable, 0, message.clone())
        }

        // Fail open toward redelivery rather than silently dropping data
        MigrationError::TransactionFailed(_) | MigrationError::InvalidItem(_) => {
            ClassifiedError::new(FailureKind::Retryable, 0, error.to_string())
        }
    }
}

/// Classify an opaque handler error.
///
/// Crate errors anywhere in the chain classify through the table above;
/// anything else is retryable, so the system fails open toward redelivery.
pub fn classify(error: &anyhow::Error) -> ClassifiedError {
    for cause in error.chain() {
        if let Some(migration_error) = cause.downcast_ref::<MigrationError>() {
            return classify_migration_error(migration_error);
        }
    }

    ClassifiedError::new(FailureKind::Retryable, 0, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EntityKind;

    #[test]
    fn test_status_table() {
        assert_eq!(classify_status(429, "").kind, FailureKind::RateLimited);
        assert_eq!(classify_status(400, "").kind, FailureKind::Unrecoverable);
        for status in [401, 403, 405, 406, 422] {
            assert_eq!(classify_status(status, "").kind, FailureKind::Unrecoverable);
        }
        assert_eq!(classify_status(404, "").kind, FailureKind::Permanent);
        for status in [408, 409, 410, 412, 500, 502, 503, 504] {
            assert_eq!(classify_status(status, "").kind, FailureKind::Retryable);
        }
        // Unknown statuses are unrecoverable
        assert_eq!(classify_status(418, "").kind, FailureKind::Unrecoverable);
        assert_eq!(classify_status(302, "").kind, FailureKind::Unrecoverable);
    }

    #[test]
    fn test_classified_status_is_carried() {
        let classified = classify_status(503, "upstream down");
        assert_eq!(classified.status, 503);
        assert_eq!(classified.message, "upstream down");
        assert!(classified.should_redeliver());
    }

    #[test]
    fn test_policy_violations_are_permanent() {
        let deletion = MigrationError::EntityDeletionUnsupported {
            kind: EntityKind::Location,
        };
        let classified = classify_migration_error(&deletion);
        assert_eq!(classified.kind, FailureKind::Permanent);
        assert_eq!(classified.status, 0);
        assert!(!classified.should_redeliver());
    }

    #[test]
    fn test_unknown_error_fails_open_to_retryable() {
        let opaque = anyhow::anyhow!("socket closed unexpectedly");
        assert_eq!(classify(&opaque).kind, FailureKind::Retryable);
    }

    #[test]
    fn test_wrapped_crate_error_classifies_through_chain() {
        let inner = MigrationError::Transport {
            status: 404,
            message: "record gone".into(),
        };
        let wrapped = anyhow::Error::from(inner).context("while calling the record api");
        let classified = classify(&wrapped);
        assert_eq!(classified.kind, FailureKind::Permanent);
        assert_eq!(classified.status, 404);
    }

    #[test]
    fn test_malformed_body_is_unrecoverable() {
        let err = MigrationError::MalformedBody("not json".into());
        assert_eq!(
            classify_migration_error(&err).kind,
            FailureKind::Unrecoverable
        );
    }
}
