use serde::{Deserialize, Serialize};

fn default_receive_count() -> u32 {
    1
}

/// One message from the at-least-once delivery queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Queue-assigned message identifier.
    pub id: String,

    /// How many times the queue has delivered this message, starting at 1.
    #[serde(rename = "receiveCount", default = "default_receive_count")]
    pub receive_count: u32,

    /// Opaque payload; the record handler owns its interpretation.
    pub body: String,
}

impl Message {
    pub fn new(id: &str, receive_count: u32, body: &str) -> Self {
        Self {
            id: id.to_string(),
            receive_count,
            body: body.to_string(),
        }
    }
}

/// A delivered batch of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEvent {
    #[serde(rename = "records", default)]
    pub records: Vec<Message>,
}

/// One message reported back to the queue for redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}

impl ItemFailure {
    pub fn new(message_id: &str) -> Self {
        Self {
            item_identifier: message_id.to_string(),
        }
    }
}

/// The batch handler's only externally observable output: messages absent
/// from this list are treated by the queue infrastructure as successfully
/// consumed and never redelivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(rename = "batchItemFailures")]
    pub batch_item_failures: Vec<ItemFailure>,
}

impl BatchResponse {
    pub fn new(batch_item_failures: Vec<ItemFailure>) -> Self {
        Self {
            batch_item_failures,
        }
    }
}
