/// Events published by the Circle core
use crate::thread_store::Message;
use serde::{Deserialize, Serialize};

/// State changes and write outcomes, streamed to any subscriber.
///
/// Mutation events are sent after the in-memory state has changed; write
/// events follow once the background queue has applied the durable write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CircleEvent {
    /// A contact joined the circle
    ContactAdded { name: String },
    /// A contact left the circle
    ContactRemoved { name: String },
    /// A message was appended to a thread
    MessageAppended { contact: String, message: Message },
    /// A thread was emptied and its key removed
    ThreadCleared { contact: String },
    /// A durable write for `key` completed
    WriteCommitted { key: String },
    /// A durable write for `key` failed; in-memory state is unaffected
    WriteFailed { key: String, error: String },
}
