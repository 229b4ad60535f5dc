/// Persisted key layout
///
///   "circle-contacts"  -> JSON array of contact names
///   "chat-<name>"      -> JSON array of {"text", "timestamp"} objects

pub const CONTACTS_KEY: &str = "circle-contacts";
pub const THREAD_KEY_PREFIX: &str = "chat-";

/// Derived key of a contact's thread. Renaming a contact would orphan it.
pub fn thread_key(name: &str) -> String {
    format!("{}{}", THREAD_KEY_PREFIX, name)
}
