//! # eth-family-bot
//!
//! Daily watcher for the most followed Farcaster accounts. It notices
//! accounts that renamed themselves (usually to a `.eth` name) and announces
//! them as a thread of casts.
//!
//! ## Core Contract
//!
//! 1. Look up yesterday's members, by id and in yesterday's order
//! 2. Diff the two snapshots position by position into identity changes
//! 3. Pack the changes into segments under the 320 byte cast limit
//! 4. Publish the segments as a reply chain, each anchored to the previous
//! 5. Store today's leaderboard as tomorrow's baseline
//!
//! ## Architecture
//!
//! ```text
//! DailySchedule → CycleController → SnapshotDiffer → SegmentFormatter → ThreadPublisher
//!                      ↓                                                      ↓
//!          LeaderboardSource (Dune)  SnapshotStore (file/Postgres)   Publisher (Neynar)
//! ```
//!
//! ## Guarantees
//!
//! - Same snapshots → same changes, in position order
//! - Every segment is strictly shorter than its limit
//! - A reply is never submitted before its parent's link is known
//! - The first publishing failure ends the thread

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod differ;
pub mod formatter;
pub mod publisher;
pub mod source;
pub mod store;
pub mod controller;
pub mod schedule;
pub mod config;

// Re-exports
pub use types::{MemberId, LeaderboardEntry, Snapshot, IdentityChange, KeyedDiff, Segment, ThreadLink};
pub use differ::{diff, diff_by_id, DiffError};
pub use formatter::{format, SegmentFormatter, FormatError};
pub use publisher::{
    Publisher, PublishError, ThreadPublisher, ThreadState, PartialThread,
    RecordingPublisher, PublishedPost, NeynarPublisher, NeynarConfig,
};
pub use source::{LeaderboardSource, SourceError, InMemoryLeaderboard, DuneSource, DuneConfig};
pub use store::{SnapshotStore, StoreError, StoredSnapshot, InMemorySnapshotStore, FileSnapshotStore};
#[cfg(feature = "postgres")]
pub use store::PostgresSnapshotStore;
pub use controller::{
    CycleController, ControllerConfig, CycleError, CycleReport, CycleState, PublishFailure,
    DEFAULT_INTRO_MESSAGE,
};
pub use schedule::{DailySchedule, ScheduleError, run_daily, run_daily_with_clock, run_logged};
pub use config::{BotConfig, ConfigError};

/// Maximum cast length in bytes; segments stay strictly below it.
pub const SEGMENT_LIMIT: usize = 320;

/// Number of leaderboard rows tracked by default.
pub const DEFAULT_LEADERBOARD_SIZE: usize = 150;
