/// Thread storage: per-contact message history
/// Each thread is one JSON array under "chat-<name>", rewritten on every append
use crate::error::{CircleError, Result};
use crate::storage::{thread_key, KeyValueStore, WriteBehind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// One sent message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    /// Creation instant, epoch milliseconds
    pub timestamp: i64,
}

pub struct ThreadStore {
    store: Arc<dyn KeyValueStore>,
    writer: WriteBehind,
    threads: HashMap<String, Vec<Message>>,
}

impl ThreadStore {
    pub fn new(store: Arc<dyn KeyValueStore>, writer: WriteBehind) -> Self {
        Self {
            store,
            writer,
            threads: HashMap::new(),
        }
    }

    /// Full thread for `name`, read from storage on first access.
    /// An unreadable thread comes back empty and is not cached, so the next
    /// access tries storage again.
    pub async fn load_thread(&mut self, name: &str) -> &[Message] {
        match self.try_load_thread(name).await {
            Ok(thread) => thread,
            Err(e) => {
                warn!("Failed to read thread {}: {}", thread_key(name), e);
                &[]
            }
        }
    }

    /// Like `load_thread`, but a storage read failure is returned to the caller
    pub async fn try_load_thread(&mut self, name: &str) -> Result<&[Message]> {
        if !self.threads.contains_key(name) {
            let messages = self.read(name).await?;
            self.threads.insert(name.to_string(), messages);
        }
        Ok(self.threads.get(name).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Read the persisted thread without caching it.
    /// Read and parse failures are logged and yield an empty thread.
    pub async fn fetch(&self, name: &str) -> Vec<Message> {
        self.read(name).await.unwrap_or_else(|e| {
            warn!("Failed to read thread {}: {}", thread_key(name), e);
            Vec::new()
        })
    }

    /// Malformed JSON reads as empty; an unreadable key is an error
    async fn read(&self, name: &str) -> Result<Vec<Message>> {
        // Queued writes land first, so a dropped cache entry never reads stale data
        self.writer.flush().await;

        let key = thread_key(name);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) => Ok(messages),
            Err(e) => {
                warn!("Malformed thread {}, treating as empty: {}", key, e);
                Ok(Vec::new())
            }
        }
    }

    /// In-memory thread, if it has been loaded
    pub fn cached(&self, name: &str) -> Option<&[Message]> {
        self.threads.get(name).map(Vec::as_slice)
    }

    /// Append a message and queue a rewrite of the whole thread.
    /// Fails with `StorageRead` rather than overwrite history it could not read.
    pub async fn append(&mut self, name: &str, text: &str) -> Result<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CircleError::InvalidMessage);
        }

        self.try_load_thread(name).await?;
        let thread = self.threads.entry(name.to_string()).or_default();

        // Never go backwards, even if the wall clock does
        let now = chrono::Utc::now().timestamp_millis();
        let timestamp = thread.last().map_or(now, |last| last.timestamp.max(now));

        let message = Message {
            text: text.to_string(),
            timestamp,
        };
        thread.push(message.clone());
        debug!("Appended message to {} ({} total)", name, thread.len());

        self.writer.set_json(thread_key(name), &*thread);
        Ok(message)
    }

    /// Empty the thread and remove its key
    pub fn clear(&mut self, name: &str) {
        self.threads.remove(name);
        self.writer.remove(thread_key(name));
        debug!("Cleared thread {}", name);
    }

    /// Drop the in-memory copy; storage is untouched
    pub fn evict(&mut self, name: &str) {
        self.threads.remove(name);
    }
}
