/// Circle - local-first contact and chat persistence
///
/// Keeps a small circle of contacts and one message thread per contact in a
/// key-value store, with an in-memory preview of each thread's last message.
/// In-memory state is authoritative for the running session; durable writes
/// happen behind it and report their outcome as events.

pub mod circle;
pub mod cli_app;
pub mod config;
pub mod contact_registry;
pub mod error;
pub mod events;
pub mod preview_cache;
pub mod storage;
pub mod thread_store;

pub use circle::Circle;
pub use config::{Config, RemovalPolicy};
pub use contact_registry::MAX_CONTACTS;
pub use error::{CircleError, Result};
pub use events::CircleEvent;
pub use storage::{KeyValueStore, MemoryStore, SledStore};
pub use thread_store::Message;
