/// Contact registry: the ordered circle of contact names
/// Persisted as one JSON array under "circle-contacts"; every change rewrites the whole list
use crate::error::{CircleError, Result};
use crate::storage::{KeyValueStore, WriteBehind, CONTACTS_KEY};
use tracing::{debug, info, warn};

/// Maximum number of contacts in a circle
pub const MAX_CONTACTS: usize = 10;

pub struct ContactRegistry {
    names: Vec<String>,
    writer: WriteBehind,
}

impl ContactRegistry {
    /// Load the persisted list. Absent, unreadable or malformed data yields an empty circle.
    pub async fn load(store: &dyn KeyValueStore, writer: WriteBehind) -> Self {
        let names = read_names(store).await;
        info!("Loaded {} contacts", names.len());
        Self { names, writer }
    }

    /// Names in display order
    pub fn list(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim();
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.names.len() >= MAX_CONTACTS
    }

    /// Append a contact and persist the list. Returns the stored (trimmed) name.
    pub fn add(&mut self, name: &str) -> Result<String> {
        if self.is_full() {
            return Err(CircleError::CapacityExceeded { max: MAX_CONTACTS });
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(CircleError::InvalidName);
        }
        if self.contains(name) {
            return Err(CircleError::DuplicateName(name.to_string()));
        }

        self.names.push(name.to_string());
        self.persist();
        debug!("Added contact {} ({}/{})", name, self.names.len(), MAX_CONTACTS);
        Ok(name.to_string())
    }

    /// Remove a contact and persist the list. Returns false if it was not present.
    pub fn remove(&mut self, name: &str) -> bool {
        let name = name.trim();
        let Some(index) = self.names.iter().position(|n| n == name) else {
            return false;
        };

        self.names.remove(index);
        self.persist();
        debug!("Removed contact {}", name);
        true
    }

    fn persist(&self) {
        self.writer.set_json(CONTACTS_KEY, &self.names);
    }
}

async fn read_names(store: &dyn KeyValueStore) -> Vec<String> {
    let raw = match store.get(CONTACTS_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Failed to read contacts, starting empty: {}", e);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(names) => normalize(names),
        Err(e) => {
            warn!("Malformed contact list, starting empty: {}", e);
            Vec::new()
        }
    }
}

/// Enforce the registry invariants on data that came from storage
fn normalize(raw: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(raw.len().min(MAX_CONTACTS));
    for name in raw {
        let name = name.trim();
        if name.is_empty() || names.iter().any(|n| n == name) {
            continue;
        }
        if names.len() == MAX_CONTACTS {
            warn!("Stored contact list exceeds {} entries, ignoring the rest", MAX_CONTACTS);
            break;
        }
        names.push(name.to_string());
    }
    names
}
