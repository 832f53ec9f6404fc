//! Core types for the leaderboard watcher.

pub mod entry;
pub mod change;
pub mod thread;

pub use entry::{MemberId, LeaderboardEntry, Snapshot};
pub use change::{IdentityChange, KeyedDiff};
pub use thread::{Segment, ThreadLink};
