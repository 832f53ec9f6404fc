//! JSON file snapshot store.
//!
//! Keeps the held snapshot across restarts. Writes go to a sibling temp file
//! that is renamed over the target, so a crash mid-write leaves the previous
//! snapshot intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{SnapshotStore, StoreError, StoredSnapshot};

/// File-backed snapshot store.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store at `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Option<StoredSnapshot>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, record: &StoredSnapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(record)?;
        let temp = self.temp_path();

        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LeaderboardEntry, Snapshot};

    fn record(name: &str) -> StoredSnapshot {
        StoredSnapshot::capture(Snapshot::new(vec![
            LeaderboardEntry::new(3, "dwr"),
            LeaderboardEntry::new(7, name),
        ]))
    }

    #[tokio::test]
    async fn test_missing_file_is_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("held.json"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("held.json"));

        store.save(&record("neo")).await.unwrap();
        store.save(&record("neo.eth")).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.snapshot.entries()[1].display_name, "neo.eth");
        assert_eq!(loaded.fingerprint, loaded.snapshot.fingerprint());
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("held.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = FileSnapshotStore::new(path);
        assert!(matches!(store.load().await, Err(StoreError::Encoding(_))));
    }
}
