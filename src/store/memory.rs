//! In-memory snapshot store.
//!
//! Holds the snapshot for the life of the process only.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{SnapshotStore, StoreError, StoredSnapshot};

/// In-memory snapshot store.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    slot: RwLock<Option<StoredSnapshot>>,
}

impl InMemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `record`.
    pub fn with_record(record: StoredSnapshot) -> Self {
        Self { slot: RwLock::new(Some(record)) }
    }

    /// Peek at the held record.
    pub fn current(&self) -> Option<StoredSnapshot> {
        self.slot.read().clone()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self) -> Result<Option<StoredSnapshot>, StoreError> {
        Ok(self.slot.read().clone())
    }

    async fn save(&self, record: &StoredSnapshot) -> Result<(), StoreError> {
        *self.slot.write() = Some(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LeaderboardEntry, Snapshot};

    #[tokio::test]
    async fn test_empty_until_saved() {
        let store = InMemorySnapshotStore::new();
        assert!(store.load().await.unwrap().is_none());

        let record = StoredSnapshot::capture(Snapshot::new(vec![LeaderboardEntry::new(1, "alice")]));
        store.save(&record).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let first = StoredSnapshot::capture(Snapshot::new(vec![LeaderboardEntry::new(1, "alice")]));
        let second = StoredSnapshot::capture(Snapshot::new(vec![LeaderboardEntry::new(2, "bob")]));
        let store = InMemorySnapshotStore::with_record(first);

        store.save(&second).await.unwrap();
        assert_eq!(store.current().unwrap().snapshot, second.snapshot);
    }
}
