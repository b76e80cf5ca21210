use crate::{KeyValueStore, StoreError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A [`KeyValueStore`] persisted as a single pretty-printed JSON object.
///
/// The file is re-read on every `get`, so values written by another process
/// (e.g. `scan login`) are picked up by a running monitor.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, format!("{json}\n"))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.load()?;
        Ok(entries.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&entries)?;

        debug!(path = %self.path.display(), key, "Stored value");
        Ok(())
    }
}
