/// Last-message previews for the contact list
///
/// Derived data only: every entry must equal the text of the tail of the
/// contact's thread, and a contact with an empty thread has no entry.
use crate::thread_store::ThreadStore;
use futures_util::future::join_all;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct PreviewCache {
    entries: HashMap<String, String>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-derive one entry from the thread's tail.
    /// If the thread cannot be read the entry is left as it was.
    pub async fn refresh(&mut self, name: &str, threads: &mut ThreadStore) {
        match threads.try_load_thread(name).await {
            Ok(thread) => {
                let tail = thread.last().map(|m| m.text.clone());
                self.apply(name, tail);
            }
            Err(e) => warn!("Keeping preview of {}, thread unreadable: {}", name, e),
        }
    }

    /// Re-derive every entry. Storage reads for uncached threads run concurrently.
    pub async fn refresh_all(&mut self, names: &[String], threads: &ThreadStore) {
        let tails = join_all(names.iter().map(|name| async move {
            let tail = match threads.cached(name) {
                Some(thread) => thread.last().map(|m| m.text.clone()),
                None => threads.fetch(name).await.pop().map(|m| m.text),
            };
            (name, tail)
        }))
        .await;

        for (name, tail) in tails {
            self.apply(name, tail);
        }
        debug!("Derived {} previews for {} contacts", self.entries.len(), names.len());
    }

    /// Drop the entry (contact removed or thread cleared)
    pub fn invalidate(&mut self, name: &str) {
        self.entries.remove(name);
    }

    /// Set the entry directly after a local append, without reading storage
    pub fn set_optimistic(&mut self, name: &str, text: &str) {
        self.entries.insert(name.to_string(), text.to_string());
    }

    fn apply(&mut self, name: &str, tail: Option<String>) {
        match tail {
            Some(text) => {
                self.entries.insert(name.to_string(), text);
            }
            None => {
                self.entries.remove(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore, WriteBehind};
    use std::sync::Arc;
    use tokio::sync::broadcast;

    fn threads_on(store: &MemoryStore) -> ThreadStore {
        let (events, _) = broadcast::channel(64);
        let store: Arc<dyn KeyValueStore> = Arc::new(store.clone());
        let writer = WriteBehind::spawn(store.clone(), events);
        ThreadStore::new(store, writer)
    }

    #[tokio::test]
    async fn test_refresh_tracks_tail() {
        let store = MemoryStore::new();
        let mut threads = threads_on(&store);
        let mut previews = PreviewCache::new();

        previews.refresh("Ann", &mut threads).await;
        assert_eq!(previews.get("Ann"), None);

        threads.append("Ann", "first").await.unwrap();
        threads.append("Ann", "second").await.unwrap();
        previews.refresh("Ann", &mut threads).await;
        assert_eq!(previews.get("Ann"), Some("second"));

        threads.clear("Ann");
        previews.refresh("Ann", &mut threads).await;
        assert_eq!(previews.get("Ann"), None);
    }

    #[tokio::test]
    async fn test_refresh_all_reads_storage() {
        let store = MemoryStore::new();
        store
            .set("chat-Ann", r#"[{"text":"a","timestamp":1},{"text":"b","timestamp":2}]"#.to_string())
            .await
            .unwrap();
        store.set("chat-Cy", "garbage".to_string()).await.unwrap();
        let threads = threads_on(&store);
        let mut previews = PreviewCache::new();

        let names: Vec<String> = vec!["Ann".into(), "Bo".into(), "Cy".into()];
        previews.refresh_all(&names, &threads).await;

        assert_eq!(previews.get("Ann"), Some("b"));
        assert_eq!(previews.get("Bo"), None);
        assert_eq!(previews.get("Cy"), None);
        assert_eq!(previews.len(), 1);
    }

    #[tokio::test]
    async fn test_optimistic_matches_refresh() {
        let store = MemoryStore::new();
        let mut threads = threads_on(&store);
        let mut previews = PreviewCache::new();

        let message = threads.append("Bo", "hey").await.unwrap();
        previews.set_optimistic("Bo", &message.text);
        let optimistic = previews.get("Bo").map(String::from);

        previews.refresh("Bo", &mut threads).await;
        assert_eq!(previews.get("Bo").map(String::from), optimistic);

        previews.invalidate("Bo");
        assert!(previews.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_thread_keeps_preview() {
        let store = MemoryStore::new();
        let mut threads = threads_on(&store);
        let mut previews = PreviewCache::new();

        threads.append("Ann", "kept").await.unwrap();
        previews.refresh("Ann", &mut threads).await;
        threads.evict("Ann");

        store.set_fail_reads(true);
        previews.refresh("Ann", &mut threads).await;
        assert_eq!(previews.get("Ann"), Some("kept"));
    }
}
