//! In-memory leaderboard for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{LeaderboardEntry, MemberId, Snapshot};
use super::{LeaderboardSource, SourceError};

#[derive(Debug, Default)]
struct Board {
    /// Ids in rank order.
    ranking: Vec<MemberId>,
    /// Current name per id.
    names: BTreeMap<MemberId, String>,
    /// Fail every fetch with this error while set.
    outage: Option<SourceError>,
    /// Drop the last row of id lookups.
    drop_last: bool,
    /// Reverse the row order of id lookups.
    reverse_lookups: bool,
}

/// In-memory leaderboard.
///
/// Members can be renamed and re-ranked between fetches. Faults (outages,
/// truncated or reordered lookups) can be switched on to exercise the
/// controller's failure paths.
#[derive(Debug, Default)]
pub struct InMemoryLeaderboard {
    board: RwLock<Board>,
    fetches: AtomicUsize,
}

impl InMemoryLeaderboard {
    /// Create an empty leaderboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a leaderboard from `(id, name)` rows in rank order.
    pub fn with_members<'a>(rows: impl IntoIterator<Item = (u64, &'a str)>) -> Self {
        let board = Self::new();
        for (id, name) in rows {
            board.push(id, name);
        }
        board
    }

    /// Append a member at the bottom of the ranking.
    pub fn push(&self, id: u64, name: &str) {
        let mut board = self.board.write();
        let id = MemberId::new(id);
        if board.names.insert(id, name.to_string()).is_none() {
            board.ranking.push(id);
        }
    }

    /// Change a member's display name.
    pub fn rename(&self, id: u64, name: &str) {
        let mut board = self.board.write();
        if let Some(current) = board.names.get_mut(&MemberId::new(id)) {
            *current = name.to_string();
        }
    }

    /// Replace the ranking order. Ids without a name are ignored.
    pub fn rerank(&self, ids: &[u64]) {
        let mut board = self.board.write();
        let ranking: Vec<MemberId> = ids
            .iter()
            .map(|id| MemberId::new(*id))
            .filter(|id| board.names.contains_key(id))
            .collect();
        board.ranking = ranking;
    }

    /// Fail every fetch with `error` until cleared with `None`.
    pub fn set_outage(&self, error: Option<SourceError>) {
        self.board.write().outage = error;
    }

    /// Drop the final row of every id lookup.
    pub fn set_drop_last(&self, enabled: bool) {
        self.board.write().drop_last = enabled;
    }

    /// Answer id lookups in reverse order.
    pub fn set_reverse_lookups(&self, enabled: bool) {
        self.board.write().reverse_lookups = enabled;
    }

    /// Number of fetches served so far, failed ones included.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeaderboardSource for InMemoryLeaderboard {
    async fn fetch_by_id_list(&self, ids: &[MemberId]) -> Result<Snapshot, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let board = self.board.read();
        if let Some(error) = &board.outage {
            return Err(error.clone());
        }

        let mut rows: Vec<LeaderboardEntry> = ids
            .iter()
            .filter_map(|id| board.names.get(id).map(|name| LeaderboardEntry::new(*id, name.clone())))
            .collect();
        if board.drop_last {
            rows.pop();
        }
        if board.reverse_lookups {
            rows.reverse();
        }

        Ok(Snapshot::new(rows))
    }

    async fn fetch_top_n(&self, n: usize) -> Result<Snapshot, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let board = self.board.read();
        if let Some(error) = &board.outage {
            return Err(error.clone());
        }

        Ok(board
            .ranking
            .iter()
            .take(n)
            .filter_map(|id| board.names.get(id).map(|name| LeaderboardEntry::new(*id, name.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_follows_requested_order() {
        let board = InMemoryLeaderboard::with_members([(1, "alice"), (2, "bob"), (3, "carol")]);
        let ids = [MemberId::new(3), MemberId::new(1)];

        let snap = board.fetch_by_id_list(&ids).await.unwrap();
        assert_eq!(snap.ids(), ids.to_vec());
    }

    #[tokio::test]
    async fn test_top_n_truncates() {
        let board = InMemoryLeaderboard::with_members([(1, "alice"), (2, "bob"), (3, "carol")]);
        board.rerank(&[3, 2, 1]);

        let top = board.fetch_top_n(2).await.unwrap();
        assert_eq!(top.ids(), vec![MemberId::new(3), MemberId::new(2)]);
    }

    #[tokio::test]
    async fn test_rename_is_visible() {
        let board = InMemoryLeaderboard::with_members([(1, "alice")]);
        board.rename(1, "alice.eth");

        let snap = board.fetch_top_n(10).await.unwrap();
        assert_eq!(snap.entries()[0].display_name, "alice.eth");
    }

    #[tokio::test]
    async fn test_outage_fails_fetches() {
        let board = InMemoryLeaderboard::with_members([(1, "alice")]);
        board.set_outage(Some(SourceError::Transport("down".into())));

        assert!(board.fetch_top_n(1).await.is_err());
        assert!(board.fetch_by_id_list(&[MemberId::new(1)]).await.is_err());
        assert_eq!(board.fetches(), 2);
    }
}
