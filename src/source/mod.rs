//! Leaderboard data sources.

pub mod memory;
pub mod dune;

use async_trait::async_trait;

use crate::types::{MemberId, Snapshot};

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The service could not be reached.
    #[error("Data source unreachable: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("Data source returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },
    /// The query ran but did not complete.
    #[error("Query execution {execution_id} ended in state {state}")]
    ExecutionFailed {
        /// Execution identifier.
        execution_id: String,
        /// Terminal state reported.
        state: String,
    },
    /// The query did not finish within the polling budget.
    #[error("Query execution {execution_id} still running after {polls} polls")]
    Timeout {
        /// Execution identifier.
        execution_id: String,
        /// Status polls performed.
        polls: u32,
    },
    /// The response could not be decoded into leaderboard rows.
    #[error("Malformed data source response: {0}")]
    Malformed(String),
}

/// Trait for leaderboard data sources.
///
/// `fetch_by_id_list` must answer in the order of the supplied ids; the
/// aligned diff relies on it and reports responses that don't.
#[async_trait]
pub trait LeaderboardSource: Send + Sync {
    /// Current names for exactly these members, in this order.
    async fn fetch_by_id_list(&self, ids: &[MemberId]) -> Result<Snapshot, SourceError>;

    /// Current top `n` members in rank order.
    async fn fetch_top_n(&self, n: usize) -> Result<Snapshot, SourceError>;
}

#[async_trait]
impl<S: LeaderboardSource + ?Sized> LeaderboardSource for std::sync::Arc<S> {
    async fn fetch_by_id_list(&self, ids: &[MemberId]) -> Result<Snapshot, SourceError> {
        (**self).fetch_by_id_list(ids).await
    }

    async fn fetch_top_n(&self, n: usize) -> Result<Snapshot, SourceError> {
        (**self).fetch_top_n(n).await
    }
}

pub use memory::InMemoryLeaderboard;
pub use dune::{DuneConfig, DuneSource};
