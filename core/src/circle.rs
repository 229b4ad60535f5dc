/// Circle: the contact list and its threads behind one API
///
/// Every mutation changes in-memory state before returning; the durable
/// write is queued on the write-behind task and its outcome is published on
/// the event channel. Methods take `&mut self`, so callers sharing a Circle
/// across tasks wrap it in a mutex and get per-key ordering for free.
use crate::config::{Config, RemovalPolicy};
use crate::contact_registry::ContactRegistry;
use crate::error::Result;
use crate::events::CircleEvent;
use crate::preview_cache::PreviewCache;
use crate::storage::{KeyValueStore, WriteBehind};
use crate::thread_store::{Message, ThreadStore};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

pub struct Circle {
    config: Config,
    contacts: ContactRegistry,
    threads: ThreadStore,
    previews: PreviewCache,
    writer: WriteBehind,
    events: broadcast::Sender<CircleEvent>,
}

impl Circle {
    /// Load contacts and derive their previews. The Circle is ready once this returns.
    pub async fn open(store: Arc<dyn KeyValueStore>, config: Config) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let writer = WriteBehind::spawn(store.clone(), events.clone());

        let contacts = ContactRegistry::load(store.as_ref(), writer.clone()).await;
        let threads = ThreadStore::new(store, writer.clone());
        let mut previews = PreviewCache::new();
        previews.refresh_all(contacts.list(), &threads).await;

        info!(
            "Circle ready: {} contacts, {} previews",
            contacts.len(),
            previews.len()
        );

        Self {
            config,
            contacts,
            threads,
            previews,
            writer,
            events,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stream of mutations and write outcomes
    pub fn subscribe(&self) -> broadcast::Receiver<CircleEvent> {
        self.events.subscribe()
    }

    /// Wait for every write queued so far to reach storage
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    pub fn list_contacts(&self) -> &[String] {
        self.contacts.list()
    }

    pub async fn add_contact(&mut self, name: &str) -> Result<String> {
        let name = self.contacts.add(name)?;
        // A retained thread from an earlier removal shows up again
        self.previews.refresh(&name, &mut self.threads).await;
        self.emit(CircleEvent::ContactAdded { name: name.clone() });
        Ok(name)
    }

    /// Returns false if no such contact exists
    pub fn remove_contact(&mut self, name: &str) -> bool {
        let name = name.trim();
        if !self.contacts.remove(name) {
            return false;
        }

        self.previews.invalidate(name);
        self.emit(CircleEvent::ContactRemoved {
            name: name.to_string(),
        });

        match self.config.removal_policy {
            RemovalPolicy::PurgeThread => {
                self.threads.clear(name);
                self.emit(CircleEvent::ThreadCleared {
                    contact: name.to_string(),
                });
            }
            RemovalPolicy::RetainThread => {
                // Storage keeps it; a re-add reads it back
                self.threads.evict(name);
                debug!("Keeping thread of removed contact {}", name);
            }
        }
        true
    }

    pub fn get_preview(&self, name: &str) -> Option<&str> {
        self.previews.get(name.trim())
    }

    pub async fn get_thread(&mut self, name: &str) -> &[Message] {
        self.threads.load_thread(name.trim()).await
    }

    /// Load a thread for display and reconcile its preview with the tail
    pub async fn open_thread(&mut self, name: &str) -> &[Message] {
        let name = name.trim();
        if self.contacts.contains(name) {
            self.previews.refresh(name, &mut self.threads).await;
        }
        self.threads.load_thread(name).await
    }

    /// Fails with `StorageRead` if the existing thread could not be read;
    /// nothing is appended in that case.
    pub async fn send_message(&mut self, name: &str, text: &str) -> Result<Message> {
        let name = name.trim();
        let message = self.threads.append(name, text).await?;

        // Previews only exist for members of the circle
        if self.contacts.contains(name) {
            self.previews.set_optimistic(name, &message.text);
        }

        self.emit(CircleEvent::MessageAppended {
            contact: name.to_string(),
            message: message.clone(),
        });
        Ok(message)
    }

    pub fn clear_thread(&mut self, name: &str) {
        let name = name.trim();
        self.threads.clear(name);
        self.previews.invalidate(name);
        self.emit(CircleEvent::ThreadCleared {
            contact: name.to_string(),
        });
    }

    fn emit(&self, event: CircleEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    async fn open_on(store: &MemoryStore, config: Config) -> Circle {
        Circle::open(Arc::new(store.clone()), config).await
    }

    #[tokio::test]
    async fn test_send_sets_preview_for_contacts_only() {
        let store = MemoryStore::new();
        let mut circle = open_on(&store, Config::default()).await;

        circle.add_contact("Ann").await.unwrap();
        circle.send_message("Ann", "hi").await.unwrap();
        circle.send_message("Stranger", "psst").await.unwrap();

        assert_eq!(circle.get_preview("Ann"), Some("hi"));
        assert_eq!(circle.get_preview("Stranger"), None);
        assert_eq!(circle.get_thread("Stranger").await.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let store = MemoryStore::new();
        let mut circle = open_on(&store, Config::default()).await;
        circle.add_contact("Ann").await.unwrap();

        assert!(circle.send_message("Ann", "   ").await.is_err());
        assert!(circle.get_thread("Ann").await.is_empty());
        assert_eq!(circle.get_preview("Ann"), None);
    }

    #[tokio::test]
    async fn test_remove_purges_thread_by_default() {
        let store = MemoryStore::new();
        let mut circle = open_on(&store, Config::default()).await;

        circle.add_contact("Ann").await.unwrap();
        circle.send_message("Ann", "hello").await.unwrap();
        assert!(circle.remove_contact("Ann"));
        assert!(!circle.remove_contact("Ann"));
        circle.flush().await;

        assert!(store.get("chat-Ann").await.unwrap().is_none());
        assert!(circle.get_thread("Ann").await.is_empty());
    }

    #[tokio::test]
    async fn test_retained_thread_returns_on_readd() {
        let store = MemoryStore::new();
        let config = Config {
            removal_policy: RemovalPolicy::RetainThread,
            ..Default::default()
        };
        let mut circle = open_on(&store, config).await;

        circle.add_contact("Bo").await.unwrap();
        circle.send_message("Bo", "still here").await.unwrap();
        circle.remove_contact("Bo");
        assert_eq!(circle.get_preview("Bo"), None);
        circle.flush().await;
        assert!(store.get("chat-Bo").await.unwrap().is_some());

        circle.add_contact("Bo").await.unwrap();
        assert_eq!(circle.get_preview("Bo"), Some("still here"));
    }

    #[tokio::test]
    async fn test_open_thread_reconciles_preview() {
        let store = MemoryStore::new();
        store.set("circle-contacts", "[\"Ann\"]".to_string()).await.unwrap();
        let mut circle = open_on(&store, Config::default()).await;
        assert_eq!(circle.get_preview("Ann"), None);

        // Written behind the circle's back
        store
            .set("chat-Ann", r#"[{"text":"from elsewhere","timestamp":5}]"#.to_string())
            .await
            .unwrap();

        let thread = circle.open_thread("Ann").await;
        assert_eq!(thread.len(), 1);
        assert_eq!(circle.get_preview("Ann"), Some("from elsewhere"));
    }

    #[tokio::test]
    async fn test_mutation_events() {
        let store = MemoryStore::new();
        let mut circle = open_on(&store, Config::default()).await;
        let mut rx = circle.subscribe();

        circle.add_contact("Ann").await.unwrap();
        circle.clear_thread("Ann");

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
        assert!(seen.contains(&CircleEvent::ContactAdded {
            name: "Ann".to_string()
        }));
        assert!(seen.contains(&CircleEvent::ThreadCleared {
            contact: "Ann".to_string()
        }));
    }
}
