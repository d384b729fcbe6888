// ============================================================================
// Structured Log Reference Codes
// ============================================================================
//
// Every operational decision point logs with a stable code from this enum.
// The codes are an operational contract: downstream alerting keys off them,
// so they are enumerable constants rather than free text.
//
// ============================================================================

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogRef {
    // Batch lifecycle
    BatchReceived,
    MessageStart,
    MessageSuccess,
    MessageConsumedPermanent,
    MessageConsumedUnrecoverable,
    MessageRedeliverRetryable,
    MessageRedeliverRateLimited,
    MessageRedeliverUnclassified,
    BatchRetrySummary,
    BatchComplete,
    MissingRequiredFields,

    // Transaction builder decisions
    EntityInsertSkipped,
    EntityInsertAdded,
    EntityUpdateSkipped,
    EntityUpdateAdded,
    EntityDeletionRejected,
    StateInsertAdded,
    StateUpdateAdded,
    EmptyTransaction,

    // Migration state resolution
    StateNotFound,
    StateFound,

    // Commit outcomes
    CommitExecuting,
    CommitSucceeded,
    CommitConflict,
    CommitFailed,

    // Record lifecycle
    RecordStart,
    RecordMigrated,
    RecordFailed,
}

impl LogRef {
    pub const fn code(self) -> &'static str {
        match self {
            Self::BatchReceived => "MIG_BATCH_001",
            Self::MessageStart => "MIG_BATCH_002",
            Self::MessageSuccess => "MIG_BATCH_003",
            Self::MessageConsumedPermanent => "MIG_BATCH_004",
            Self::MessageConsumedUnrecoverable => "MIG_BATCH_005",
            Self::MessageRedeliverRetryable => "MIG_BATCH_006",
            Self::MessageRedeliverRateLimited => "MIG_BATCH_007",
            Self::MessageRedeliverUnclassified => "MIG_BATCH_008",
            Self::BatchRetrySummary => "MIG_BATCH_009",
            Self::BatchComplete => "MIG_BATCH_010",
            Self::MissingRequiredFields => "MIG_BATCH_011",

            Self::EntityInsertSkipped => "MIG_TXN_001",
            Self::EntityInsertAdded => "MIG_TXN_002",
            Self::EntityUpdateSkipped => "MIG_TXN_003",
            Self::EntityUpdateAdded => "MIG_TXN_004",
            Self::EntityDeletionRejected => "MIG_TXN_005",
            Self::StateInsertAdded => "MIG_TXN_006",
            Self::StateUpdateAdded => "MIG_TXN_007",
            Self::EmptyTransaction => "MIG_TXN_008",

            Self::StateNotFound => "MIG_STATE_001",
            Self::StateFound => "MIG_STATE_002",

            Self::CommitExecuting => "MIG_COMMIT_001",
            Self::CommitSucceeded => "MIG_COMMIT_002",
            Self::CommitConflict => "MIG_COMMIT_003",
            Self::CommitFailed => "MIG_COMMIT_004",

            Self::RecordStart => "MIG_REC_001",
            Self::RecordMigrated => "MIG_REC_002",
            Self::RecordFailed => "MIG_REC_003",
        }
    }
}

impl fmt::Display for LogRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
