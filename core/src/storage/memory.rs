/// In-memory key-value store (tests, ephemeral sessions)
use crate::error::{CircleError, Result};
use crate::storage::KeyValueStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Clones share the same map, so a test can keep a handle and inspect what
/// the core persisted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set`/`remove` fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CircleError::StorageRead(format!("get {}: injected failure", key)));
        }
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CircleError::StorageWrite(format!("set {}: injected failure", key)));
        }
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CircleError::StorageWrite(format!("remove {}: injected failure", key)));
        }
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let handle = store.clone();

        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(handle.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(handle.keys().await, vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new();
        store.set("k", "v".to_string()).await.unwrap();

        store.set_fail_writes(true);
        assert!(matches!(
            store.set("k", "w".to_string()).await,
            Err(CircleError::StorageWrite(_))
        ));
        assert!(store.remove("k").await.is_err());

        store.set_fail_reads(true);
        assert!(matches!(store.get("k").await, Err(CircleError::StorageRead(_))));

        store.set_fail_reads(false);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
