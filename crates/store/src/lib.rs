//! Durable string key-value storage.
//!
//! The dashboard keeps two things across restarts: the merchant auth token
//! and the scan status map. Both are stored as strings under fixed keys.

pub mod file;

pub use file::FileStore;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not a valid JSON object: {0}")]
    Serde(#[from] serde_json::Error),
}

/// String-keyed storage that outlives the process.
pub trait KeyValueStore {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new().with("token", "abc");
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("token", "def").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("def"));
    }
}
