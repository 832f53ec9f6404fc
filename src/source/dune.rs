//! Dune query service source.
//!
//! Both lookups run a published Dune query and read its result rows:
//! - the leaderboard query returns the most followed accounts in rank order
//! - the username lookup query takes a `fid_list_parameter` text parameter
//!   such as `(3, 2, 5650)` and returns one row per fid, in that order
//!
//! Running a query is execute, then poll the status until it reaches a
//! terminal state, then read the results.
//!
//! ## Configuration
//!
//! - `DUNE_API_KEY`: API key sent as `X-Dune-API-Key` (required)
//! - `DUNE_BASE_URL`: API root (default: https://api.dune.com)
//! - `CURRENT_LEADERBOARD_QUERY_ID`: leaderboard query (default: 3380826)
//! - `USERNAME_LOOKUP_QUERY_ID`: lookup query (default: 3386538)
//! - `DUNE_POLL_INTERVAL_MS`: delay between status polls (default: 2000)
//! - `DUNE_MAX_POLLS`: polls before giving up (default: 150)

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{LeaderboardEntry, MemberId, Snapshot};
use super::{LeaderboardSource, SourceError};

/// Default API root.
pub const DEFAULT_DUNE_BASE_URL: &str = "https://api.dune.com";
/// Published query returning the current leaderboard.
pub const CURRENT_LEADERBOARD_QUERY_ID: u64 = 3380826;
/// Published query returning usernames for a fid list.
pub const USERNAME_LOOKUP_QUERY_ID: u64 = 3386538;
/// Name of the lookup query's parameter.
pub const FID_LIST_PARAMETER: &str = "fid_list_parameter";

/// Configuration for [`DuneSource`].
#[derive(Debug, Clone)]
pub struct DuneConfig {
    /// API root, without trailing slash.
    pub base_url: String,
    /// API key.
    pub api_key: String,
    /// Leaderboard query id.
    pub leaderboard_query_id: u64,
    /// Username lookup query id.
    pub lookup_query_id: u64,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Status polls before the execution is reported as timed out.
    pub max_polls: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl DuneConfig {
    /// Create a config against the public API with the published queries.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_DUNE_BASE_URL.to_string(),
            api_key: api_key.into(),
            leaderboard_query_id: CURRENT_LEADERBOARD_QUERY_ID,
            lookup_query_id: USERNAME_LOOKUP_QUERY_ID,
            poll_interval: Duration::from_millis(2000),
            max_polls: 150,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize)]
struct ExecuteRequest {
    query_parameters: BTreeMap<&'static str, String>,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    execution_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    state: String,
}

#[derive(Debug, Deserialize)]
struct ResultsResponse {
    result: Option<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    rows: Vec<UserRow>,
}

/// One result row. Extra columns such as `total_followers` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRow {
    /// Farcaster id.
    pub fid: u64,
    /// Current username.
    pub username: String,
}

/// Lifecycle of a query execution as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Queued or running.
    Running,
    /// Results are available.
    Completed,
    /// Failed, cancelled or expired.
    Terminated,
}

impl ExecutionState {
    /// Parse a `QUERY_STATE_*` value.
    pub fn from_api(state: &str) -> Self {
        match state {
            "QUERY_STATE_COMPLETED" => Self::Completed,
            "QUERY_STATE_PENDING" | "QUERY_STATE_EXECUTING" => Self::Running,
            _ => Self::Terminated,
        }
    }
}

/// Render ids as the lookup query's list parameter.
///
/// `[10, 11, 12]` becomes `(10, 11, 12)`.
pub fn fid_list_parameter(ids: &[MemberId]) -> String {
    let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("({})", joined.join(", "))
}

/// Turn result rows into a snapshot, keeping row order.
pub fn rows_to_snapshot(rows: Vec<UserRow>) -> Snapshot {
    rows.into_iter()
        .map(|row| LeaderboardEntry::new(row.fid, row.username))
        .collect()
}

/// Leaderboard source backed by Dune queries.
pub struct DuneSource {
    client: Client,
    config: DuneConfig,
}

impl DuneSource {
    /// Create a source.
    pub fn new(config: DuneConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SourceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status: status.as_u16(), body });
        }
        response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))
    }

    /// Execute a query, wait for it, and return its rows.
    async fn run_query(
        &self,
        query_id: u64,
        parameters: BTreeMap<&'static str, String>,
    ) -> Result<Vec<UserRow>, SourceError> {
        let response = self
            .client
            .post(self.url(&format!("query/{}/execute", query_id)))
            .header("X-Dune-API-Key", &self.config.api_key)
            .json(&ExecuteRequest { query_parameters: parameters })
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        let execution: ExecuteResponse = Self::read(response).await?;
        let execution_id = execution.execution_id;

        tracing::debug!(query_id, execution_id = %execution_id, "Dune query submitted");

        let mut polls = 0;
        loop {
            let response = self
                .client
                .get(self.url(&format!("execution/{}/status", execution_id)))
                .header("X-Dune-API-Key", &self.config.api_key)
                .send()
                .await
                .map_err(|e| SourceError::Transport(e.to_string()))?;
            let status: StatusResponse = Self::read(response).await?;
            polls += 1;

            match ExecutionState::from_api(&status.state) {
                ExecutionState::Completed => break,
                ExecutionState::Terminated => {
                    return Err(SourceError::ExecutionFailed { execution_id, state: status.state });
                }
                ExecutionState::Running if polls >= self.config.max_polls => {
                    return Err(SourceError::Timeout { execution_id, polls });
                }
                ExecutionState::Running => tokio::time::sleep(self.config.poll_interval).await,
            }
        }

        let response = self
            .client
            .get(self.url(&format!("execution/{}/results", execution_id)))
            .header("X-Dune-API-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        let results: ResultsResponse = Self::read(response).await?;
        let rows = results
            .result
            .map(|r| r.rows)
            .ok_or_else(|| SourceError::Malformed("results missing `result`".to_string()))?;

        tracing::info!(query_id, execution_id = %execution_id, polls, rows = rows.len(), "Dune query completed");
        Ok(rows)
    }
}

#[async_trait]
impl LeaderboardSource for DuneSource {
    async fn fetch_by_id_list(&self, ids: &[MemberId]) -> Result<Snapshot, SourceError> {
        if ids.is_empty() {
            return Ok(Snapshot::default());
        }

        let mut parameters = BTreeMap::new();
        parameters.insert(FID_LIST_PARAMETER, fid_list_parameter(ids));
        let rows = self.run_query(self.config.lookup_query_id, parameters).await?;

        Ok(rows_to_snapshot(rows))
    }

    async fn fetch_top_n(&self, n: usize) -> Result<Snapshot, SourceError> {
        let rows = self
            .run_query(self.config.leaderboard_query_id, BTreeMap::new())
            .await?;

        let mut snapshot = rows_to_snapshot(rows);
        snapshot.truncate(n);
        Ok(snapshot)
    }
}
