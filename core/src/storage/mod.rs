/// Key-value storage medium behind the Circle core
pub mod keys;
pub mod memory;
pub mod sled_store;
pub mod write_behind;

use crate::error::Result;
use async_trait::async_trait;

pub use keys::{thread_key, CONTACTS_KEY, THREAD_KEY_PREFIX};
pub use memory::MemoryStore;
pub use sled_store::SledStore;
pub use write_behind::WriteBehind;

/// Asynchronous string store keyed by string.
///
/// Every operation is fallible and treated as best-effort by callers: read
/// failures degrade to "absent", write failures are reported but never undo
/// in-memory state.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}
