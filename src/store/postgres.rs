//! PostgreSQL snapshot store.
//!
//! Keeps the held snapshot in a single row keyed by slot name, for
//! deployments where the local filesystem does not survive restarts.
//!
//! ## Configuration
//!
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `SNAPSHOT_SLOT`: Row key (default: current_leaderboard)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;

use crate::types::Snapshot;
use super::{SnapshotStore, StoreError, StoredSnapshot};

/// Table holding the snapshot slot.
pub const HELD_SNAPSHOT_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS held_snapshot (
    slot         TEXT PRIMARY KEY,
    entries      TEXT NOT NULL,
    fingerprint  TEXT NOT NULL,
    captured_at  TIMESTAMPTZ NOT NULL
)
"#;

/// Configuration for the PostgreSQL store.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 2).
    pub max_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Row key for the held snapshot.
    pub slot: String,
}

impl PostgresConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/eth_family_bot".to_string()),
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            slot: std::env::var("SNAPSHOT_SLOT")
                .unwrap_or_else(|_| "current_leaderboard".to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// PostgreSQL snapshot store.
pub struct PostgresSnapshotStore {
    pool: PgPool,
    slot: String,
}

impl PostgresSnapshotStore {
    /// Connect and make sure the table exists.
    pub async fn new(config: PostgresConfig) -> Result<Self, StoreError> {
        tracing::info!(
            max_connections = config.max_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            slot = %config.slot,
            "Initializing PostgreSQL snapshot store"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.database_url)
            .await?;

        sqlx::query(HELD_SNAPSHOT_TABLE_SCHEMA).execute(&pool).await?;

        Ok(Self { pool, slot: config.slot })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, StoreError> {
        Self::new(PostgresConfig::from_env()).await
    }
}

#[async_trait]
impl SnapshotStore for PostgresSnapshotStore {
    async fn load(&self) -> Result<Option<StoredSnapshot>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT entries, fingerprint, captured_at
            FROM held_snapshot
            WHERE slot = $1
            "#
        )
        .bind(&self.slot)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => {
                let entries: String = r.try_get("entries")?;
                let fingerprint: String = r.try_get("fingerprint")?;
                let captured_at: DateTime<Utc> = r.try_get("captured_at")?;
                let snapshot: Snapshot = serde_json::from_str(&entries)?;

                Ok(Some(StoredSnapshot { snapshot, captured_at, fingerprint }))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, record: &StoredSnapshot) -> Result<(), StoreError> {
        let entries = serde_json::to_string(&record.snapshot)?;

        sqlx::query(
            r#"
            INSERT INTO held_snapshot (slot, entries, fingerprint, captured_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slot) DO UPDATE
            SET entries = EXCLUDED.entries,
                fingerprint = EXCLUDED.fingerprint,
                captured_at = EXCLUDED.captured_at
            "#
        )
        .bind(&self.slot)
        .bind(entries)
        .bind(&record.fingerprint)
        .bind(record.captured_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
