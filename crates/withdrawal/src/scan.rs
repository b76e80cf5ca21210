//! Persisted operator scan status per withdrawal key.
//!
//! Entries start as `pending` the first time a key is observed and only ever
//! move to `done` on explicit confirmation. Nothing is removed.
//!
//! Another process (e.g. `scan done`) may write the same storage entry while
//! a monitor holds a book, so every write first folds in what is stored.
//! Folding never moves a key from `done` back to `pending`.

use crate::types::{ScanStatus, WithdrawalKey};
use std::collections::BTreeMap;
use store::KeyValueStore;
use tracing::{debug, warn};

type Statuses = BTreeMap<WithdrawalKey, ScanStatus>;

/// In-memory scan status map mirrored to a [`KeyValueStore`] on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanBook {
    statuses: Statuses,
    storage_key: String,
}

impl ScanBook {
    /// Load the persisted map stored under `storage_key`.
    ///
    /// A missing, unreadable or corrupt entry starts an empty book.
    pub fn load<S: KeyValueStore>(store: &S, storage_key: &str) -> Self {
        let statuses = read_stored(store, storage_key).unwrap_or_default();
        debug!(entries = statuses.len(), "Loaded scan status");

        Self {
            statuses,
            storage_key: storage_key.to_string(),
        }
    }

    /// Fold in statuses written to the store since this book last read it.
    ///
    /// Returns how many keys changed.
    pub fn sync<S: KeyValueStore>(&mut self, store: &S) -> usize {
        let Some(stored) = read_stored(store, &self.storage_key) else {
            return 0;
        };

        let mut changed = 0;
        for (key, status) in stored {
            match self.statuses.get(&key) {
                Some(ScanStatus::Done) => {}
                Some(ScanStatus::Pending) if status == ScanStatus::Pending => {}
                _ => {
                    self.statuses.insert(key, status);
                    changed += 1;
                }
            }
        }

        if changed > 0 {
            debug!(changed, "Picked up stored scan status");
        }
        changed
    }

    /// Status of `key`. Keys never observed read as pending.
    pub fn status(&self, key: &str) -> ScanStatus {
        self.get(key).unwrap_or(ScanStatus::Pending)
    }

    pub fn get(&self, key: &str) -> Option<ScanStatus> {
        self.statuses.get(key).copied()
    }

    /// Insert `pending` for each key without an entry. Returns how many were added.
    pub fn observe<S, I>(&mut self, store: &mut S, keys: I) -> usize
    where
        S: KeyValueStore,
        I: IntoIterator<Item = WithdrawalKey>,
    {
        let mut added = 0;
        for key in keys {
            if !self.statuses.contains_key(&key) {
                self.statuses.insert(key, ScanStatus::Pending);
                added += 1;
            }
        }

        if added > 0 {
            self.persist(store);
        }
        added
    }

    /// Mark `key` as scanned. Idempotent; creates the entry if missing.
    pub fn mark_done<S: KeyValueStore>(&mut self, store: &mut S, key: &str) {
        let previous = self.statuses.insert(key.to_string(), ScanStatus::Done);
        if previous != Some(ScanStatus::Done) {
            self.persist(store);
        }
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Number of entries with the given status.
    pub fn count(&self, status: ScanStatus) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }

    // Storage failures are logged, the in-memory map stays authoritative.
    fn persist<S: KeyValueStore>(&mut self, store: &mut S) {
        self.sync(&*store);

        let json = match serde_json::to_string(&self.statuses) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to encode scan status");
                return;
            }
        };

        if let Err(e) = store.set(&self.storage_key, &json) {
            warn!(key = %self.storage_key, error = %e, "Failed to persist scan status");
        }
    }
}

/// The stored map, or `None` when it is missing or unusable.
fn read_stored<S: KeyValueStore>(store: &S, storage_key: &str) -> Option<Statuses> {
    match store.get(storage_key) {
        Ok(Some(raw)) => serde_json::from_str(&raw)
            .map_err(|e| warn!(key = storage_key, error = %e, "Ignoring unreadable scan status"))
            .ok(),
        Ok(None) => None,
        Err(e) => {
            warn!(key = storage_key, error = %e, "Failed to read scan status");
            None
        }
    }
}
