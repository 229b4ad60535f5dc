/// Ordered, fire-and-forget persistence queue
///
/// Mutations update memory first and then hand their durable write to this
/// queue. A single task drains it, so writes to the same key land in the
/// order they were submitted. Outcomes are published as `CircleEvent`s.
use crate::events::CircleEvent;
use crate::storage::KeyValueStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error};

enum WriteOp {
    Set { key: String, value: String },
    Remove { key: String },
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct WriteBehind {
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl WriteBehind {
    /// Spawn the drain task. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn KeyValueStore>, events: broadcast::Sender<CircleEvent>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drain(store, rx, events));
        Self { tx }
    }

    /// Queue a raw string write
    pub fn set(&self, key: impl Into<String>, value: String) {
        self.submit(WriteOp::Set {
            key: key.into(),
            value,
        });
    }

    /// Queue a JSON write; an unserializable value is logged and skipped
    pub fn set_json<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T) {
        let key = key.into();
        match serde_json::to_string(value) {
            Ok(json) => self.set(key, json),
            Err(e) => error!("Failed to serialize {}: {}", key, e),
        }
    }

    /// Queue a key removal
    pub fn remove(&self, key: impl Into<String>) {
        self.submit(WriteOp::Remove { key: key.into() });
    }

    /// Wait until every write queued before this call has been applied
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteOp::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    fn submit(&self, op: WriteOp) {
        if self.tx.send(op).is_err() {
            error!("Write queue closed, dropping write");
        }
    }
}

async fn drain(
    store: Arc<dyn KeyValueStore>,
    mut rx: mpsc::UnboundedReceiver<WriteOp>,
    events: broadcast::Sender<CircleEvent>,
) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Set { key, value } => {
                let result = store.set(&key, value).await;
                report(&events, key, result);
            }
            WriteOp::Remove { key } => {
                let result = store.remove(&key).await;
                report(&events, key, result);
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Write queue closed");
}

fn report(events: &broadcast::Sender<CircleEvent>, key: String, result: crate::Result<()>) {
    // send() only errs when nobody is subscribed
    match result {
        Ok(()) => {
            debug!("Persisted {}", key);
            let _ = events.send(CircleEvent::WriteCommitted { key });
        }
        Err(e) => {
            error!("Failed to persist {}: {}", key, e);
            let _ = events.send(CircleEvent::WriteFailed {
                key,
                error: e.to_string(),
            });
        }
    }
}
