pub mod message;
pub mod processor;

pub use message::{BatchEvent, BatchResponse, ItemFailure, Message};
pub use processor::{validate_required_fields, FnHandler, MessageBatchProcessor, RecordHandler};
