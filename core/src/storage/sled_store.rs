/// Durable key-value store backed by sled
/// One database per data directory: <data_dir>/circle.db
use crate::error::{CircleError, Result};
use crate::storage::KeyValueStore;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
}

impl SledStore {
    /// Open (or create) the store in the given data directory
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("circle.db");
        debug!("Opening circle store at {:?}", db_path);

        let db = sled::open(&db_path).map_err(|e| {
            CircleError::StorageRead(format!("Failed to open circle store: {}", e))
        })?;

        info!("Circle store initialized at {:?}", db_path);
        Ok(Self { db: Arc::new(db) })
    }

    /// Number of stored keys
    pub fn count(&self) -> usize {
        self.db.len()
    }
}

#[async_trait]
impl KeyValueStore for SledStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        debug!("Reading {}", key);

        let value = self
            .db
            .get(key.as_bytes())
            .map_err(|e| CircleError::StorageRead(format!("get {}: {}", key, e)))?;

        match value {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| CircleError::StorageRead(format!("get {}: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        debug!("Writing {}: {} bytes", key, value.len());

        self.db
            .insert(key.as_bytes(), value.into_bytes())
            .map_err(|e| CircleError::StorageWrite(format!("set {}: {}", key, e)))?;

        self.db
            .flush_async()
            .await
            .map_err(|e| CircleError::StorageWrite(format!("flush after set {}: {}", key, e)))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        debug!("Removing {}", key);

        self.db
            .remove(key.as_bytes())
            .map_err(|e| CircleError::StorageWrite(format!("remove {}: {}", key, e)))?;

        self.db
            .flush_async()
            .await
            .map_err(|e| CircleError::StorageWrite(format!("flush after remove {}: {}", key, e)))?;

        Ok(())
    }
}
