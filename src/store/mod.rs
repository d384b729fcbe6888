pub mod memory;

use async_trait::async_trait;

use crate::core::Result;
use crate::state::MigrationState;
use crate::transaction::TransactionItem;

pub use memory::InMemoryStore;

/// Port onto the transactional key-value store.
///
/// `commit` submits all items atomically: the entire submission fails with
/// `MigrationError::TransactionConflict` if any item's condition does not
/// hold, and no item is applied. `load_state` must be a consistent
/// (non-stale) read: it gates insert-vs-update decisions, and a stale
/// answer would send an insert against an existing key.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    async fn load_state(&self, source_record_id: &str) -> Result<Option<MigrationState>>;

    async fn commit(&self, items: &[TransactionItem]) -> Result<()>;
}
