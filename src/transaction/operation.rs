use crate::state::{EntitySnapshot, MigrationState};

/// Why an entity contributes nothing to the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No new value and nothing written previously.
    NothingToAdd,
    /// The new value is structurally equal to the stored snapshot:
    /// idempotent replay of an at-least-once delivery.
    NoChanges,
}

/// Why an entity write is rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Deleting a previously migrated entity is unsupported.
    DeletionUnsupported,
}

/// The four-way decision for one entity within a transaction.
///
/// Expected control flow is data, not exceptions: the builder pattern-matches
/// on this instead of catching errors to branch.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation<'a> {
    Insert(&'a EntitySnapshot),
    Update {
        previous: &'a EntitySnapshot,
        current: &'a EntitySnapshot,
    },
    Skip(SkipReason),
    Reject(RejectReason),
}

/// Decide what a new snapshot means for an entity kind, given the prior
/// migration state.
pub fn decide<'a>(
    prior: Option<&'a EntitySnapshot>,
    new: Option<&'a EntitySnapshot>,
) -> Operation<'a> {
    match (prior, new) {
        (None, None) => Operation::Skip(SkipReason::NothingToAdd),
        (Some(_), None) => Operation::Reject(RejectReason::DeletionUnsupported),
        (None, Some(snapshot)) => Operation::Insert(snapshot),
        (Some(previous), Some(current)) => {
            if previous == current {
                Operation::Skip(SkipReason::NoChanges)
            } else {
                Operation::Update { previous, current }
            }
        }
    }
}

/// Convenience wrapper taking the state directly.
pub fn decide_for_state<'a>(
    state: &'a MigrationState,
    kind: crate::state::EntityKind,
    new: Option<&'a EntitySnapshot>,
) -> Operation<'a> {
    decide(state.snapshot(kind), new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str) -> EntitySnapshot {
        EntitySnapshot::from_json(&serde_json::json!({ "id": "e-1", "name": name })).unwrap()
    }

    #[test]
    fn test_nothing_to_add() {
        assert_eq!(decide(None, None), Operation::Skip(SkipReason::NothingToAdd));
    }

    #[test]
    fn test_deletion_rejected() {
        let prior = snapshot("A");
        assert_eq!(
            decide(Some(&prior), None),
            Operation::Reject(RejectReason::DeletionUnsupported)
        );
    }

    #[test]
    fn test_fresh_value_inserts() {
        let new = snapshot("A");
        assert_eq!(decide(None, Some(&new)), Operation::Insert(&new));
    }

    #[test]
    fn test_equal_value_skips() {
        let prior = snapshot("A");
        let new = snapshot("A");
        assert_eq!(
            decide(Some(&prior), Some(&new)),
            Operation::Skip(SkipReason::NoChanges)
        );
    }

    #[test]
    fn test_different_value_updates() {
        let prior = snapshot("A");
        let new = snapshot("B");
        assert_eq!(
            decide(Some(&prior), Some(&new)),
            Operation::Update {
                previous: &prior,
                current: &new
            }
        );
    }
}
