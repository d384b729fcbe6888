pub mod builder;
pub mod item;
pub mod operation;

pub use builder::TransactionBuilder;
pub use item::{
    ItemKey, TransactionItem, WriteCondition, DISCRIMINATOR_DOCUMENT, DISCRIMINATOR_FIELD,
};
pub use operation::{decide, decide_for_state, Operation, RejectReason, SkipReason};
