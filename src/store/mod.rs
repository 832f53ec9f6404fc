//! Held snapshot storage backends.
//!
//! A store holds a single slot: the leaderboard captured at the end of the
//! last completed cycle. Saving overwrites it; nothing is merged or kept
//! historically.

pub mod memory;
pub mod file;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Snapshot;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("Snapshot store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The stored record could not be encoded or decoded.
    #[error("Snapshot store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    /// Database failure.
    #[error("Snapshot store database error: {0}")]
    Database(String),
}

/// The held snapshot plus when and what it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    /// Leaderboard in rank order.
    pub snapshot: Snapshot,
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
    /// Fingerprint of `snapshot` at capture time.
    pub fingerprint: String,
}

impl StoredSnapshot {
    /// Wrap a freshly fetched snapshot.
    pub fn capture(snapshot: Snapshot) -> Self {
        Self {
            fingerprint: snapshot.fingerprint(),
            captured_at: Utc::now(),
            snapshot,
        }
    }
}

/// Trait for held snapshot storage.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the held snapshot, `None` before the first completed cycle.
    async fn load(&self) -> Result<Option<StoredSnapshot>, StoreError>;

    /// Replace the held snapshot.
    async fn save(&self, record: &StoredSnapshot) -> Result<(), StoreError>;
}

#[async_trait]
impl<K: SnapshotStore + ?Sized> SnapshotStore for std::sync::Arc<K> {
    async fn load(&self) -> Result<Option<StoredSnapshot>, StoreError> {
        (**self).load().await
    }

    async fn save(&self, record: &StoredSnapshot) -> Result<(), StoreError> {
        (**self).save(record).await
    }
}

#[async_trait]
impl<K: SnapshotStore + ?Sized> SnapshotStore for Box<K> {
    async fn load(&self) -> Result<Option<StoredSnapshot>, StoreError> {
        (**self).load().await
    }

    async fn save(&self, record: &StoredSnapshot) -> Result<(), StoreError> {
        (**self).save(record).await
    }
}

pub use memory::InMemorySnapshotStore;
pub use file::FileSnapshotStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresSnapshotStore;
