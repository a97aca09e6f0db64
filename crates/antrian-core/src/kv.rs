//! Key-value collaborator behind the queue state.
//!
//! The store only needs `get(key)` / `set(key, value)`. Two backends ship:
//! a sled database on the host filesystem (server deployment) and an in-process map
//! with change notifications (the per-browser local-storage deployment).

use crate::error::QueueResult;
use dashmap::DashMap;
use std::path::Path;
use tokio::sync::broadcast;

const DEFAULT_SLED_PATH: &str = "./data/antrian";

/// Minimal key-value seam. Values are opaque bytes; the store owns the encoding.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> QueueResult<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> QueueResult<()>;
}

/// Sled-backed store on the host filesystem.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) the database at `path`, or at `./data/antrian` when `None`.
    pub fn open(path: Option<impl AsRef<Path>>) -> QueueResult<Self> {
        let p = path
            .map(|x| x.as_ref().to_path_buf())
            .unwrap_or_else(|| Path::new(DEFAULT_SLED_PATH).to_path_buf());
        let db = sled::open(p)?;
        Ok(Self { db })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> QueueResult<Option<Vec<u8>>> {
        Ok(self.db.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> QueueResult<()> {
        self.db.insert(key.as_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }
}

/// In-process store. Every `set` broadcasts the key so same-process followers can
/// re-read immediately instead of waiting for their next poll.
pub struct MemoryStore {
    entries: DashMap<String, Vec<u8>>,
    changes: broadcast::Sender<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            entries: DashMap::new(),
            changes,
        }
    }

    /// Subscribe to change notifications (the changed key).
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> QueueResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &[u8]) -> QueueResult<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        // No subscribers is fine.
        let _ = self.changes.send(key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sled_store_round_trips_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(Some(dir.path())).unwrap();
            assert!(store.get("queue").unwrap().is_none());
            store.set("queue", b"{\"version\":1}").unwrap();
        }
        let store = SledStore::open(Some(dir.path())).unwrap();
        assert_eq!(store.get("queue").unwrap().unwrap(), b"{\"version\":1}".to_vec());
    }

    #[test]
    fn memory_store_notifies_subscribers() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();
        store.set("queue", b"x").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "queue");
        assert_eq!(store.get("queue").unwrap(), Some(b"x".to_vec()));
    }
}
