//! Identity change records produced by the differ.

use serde::{Deserialize, Serialize};

use super::entry::{LeaderboardEntry, MemberId};

/// A detected rename of the same tracked account between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityChange {
    /// Name held in the earlier snapshot.
    pub previous_name: String,
    /// Name held in the later snapshot.
    pub new_name: String,
}

impl IdentityChange {
    /// Create a new change record.
    pub fn new(previous_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            previous_name: previous_name.into(),
            new_name: new_name.into(),
        }
    }
}

/// Result of diffing two snapshots keyed by member id.
///
/// Unlike the aligned diff this does not depend on row order, and it reports
/// membership churn explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedDiff {
    /// Renames, in the earlier snapshot's order.
    pub changes: Vec<IdentityChange>,
    /// Members of the earlier snapshot missing from the later one.
    pub left: Vec<MemberId>,
    /// Members of the later snapshot missing from the earlier one.
    pub joined: Vec<LeaderboardEntry>,
}

impl KeyedDiff {
    /// True when nothing changed at all.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.left.is_empty() && self.joined.is_empty()
    }
}
