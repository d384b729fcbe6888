pub mod application;
pub mod processor;

pub use application::{
    BatchApplication, ChangeEvent, SnapshotMapper, METHOD_INSERT, METHOD_UPDATE,
};
pub use processor::{MigrationMetrics, MigrationOutcome, MigrationRequest, RecordMigrator};
