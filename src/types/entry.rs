//! Leaderboard entries and ranked snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh64::Xxh64;

/// Stable external identifier of a tracked account (the Farcaster fid).
///
/// Implements `Ord` so keyed lookups iterate deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(u64);

impl MemberId {
    /// Create a new MemberId.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw identifier.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MemberId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One row of the leaderboard.
///
/// Identity is `id`; `display_name` is mutable and is what the bot watches.
/// Rank is implicit in the entry's position inside a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Stable identifier.
    pub id: MemberId,
    /// Current username.
    pub display_name: String,
}

impl LeaderboardEntry {
    /// Create a new entry.
    pub fn new(id: impl Into<MemberId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Ordered capture of the leaderboard at one point in time.
///
/// Order is significant: the aligned diff compares position `i` of one
/// snapshot with position `i` of the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: Vec<LeaderboardEntry>,
}

impl Snapshot {
    /// Create a snapshot from entries in rank order.
    pub fn new(entries: Vec<LeaderboardEntry>) -> Self {
        Self { entries }
    }

    /// Entries in rank order.
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// Member ids in rank order, the request order for the next lookup.
    pub fn ids(&self) -> Vec<MemberId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep at most `n` leading entries.
    pub fn truncate(&mut self, n: usize) {
        self.entries.truncate(n);
    }

    /// Deterministic fingerprint of ids and names, in order.
    ///
    /// xxh64 over each entry's id and length-prefixed name, as 16 hex digits.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Xxh64::new(0);
        for entry in &self.entries {
            hasher.update(&entry.id.get().to_le_bytes());
            hasher.update(&(entry.display_name.len() as u64).to_le_bytes());
            hasher.update(entry.display_name.as_bytes());
        }
        format!("{:016x}", hasher.digest())
    }
}

impl From<Vec<LeaderboardEntry>> for Snapshot {
    fn from(entries: Vec<LeaderboardEntry>) -> Self {
        Self::new(entries)
    }
}

impl FromIterator<LeaderboardEntry> for Snapshot {
    fn from_iter<I: IntoIterator<Item = LeaderboardEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot::new(vec![
            LeaderboardEntry::new(3, "dwr"),
            LeaderboardEntry::new(2, "v"),
            LeaderboardEntry::new(5650, "vitalik"),
        ])
    }

    #[test]
    fn test_ids_keep_rank_order() {
        let ids: Vec<u64> = sample().ids().iter().map(MemberId::get).collect();
        assert_eq!(ids, vec![3, 2, 5650]);
    }

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        let a = sample();
        let mut reversed: Vec<_> = a.entries().to_vec();
        reversed.reverse();
        let b = Snapshot::new(reversed);

        assert_eq!(a.fingerprint(), sample().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_tracks_names() {
        let mut renamed: Vec<_> = sample().entries().to_vec();
        renamed[1].display_name = "v.eth".to_string();

        assert_eq!(sample().fingerprint().len(), 16);
        assert_ne!(sample().fingerprint(), Snapshot::new(renamed).fingerprint());
    }

    #[test]
    fn test_fingerprint_separates_adjacent_names() {
        let a = Snapshot::new(vec![LeaderboardEntry::new(1, "ab"), LeaderboardEntry::new(1, "c")]);
        let b = Snapshot::new(vec![LeaderboardEntry::new(1, "a"), LeaderboardEntry::new(1, "bc")]);

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.starts_with(r#"[{"id":3,"display_name":"dwr"}"#));

        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }
}
