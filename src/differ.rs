//! Snapshot differ.
//!
//! Two ways to compare yesterday's leaderboard with today's lookup:
//!
//! - [`diff`] is position-aligned. Row `i` of the new snapshot must describe
//!   the same member as row `i` of the old one, which holds when the lookup
//!   was requested with the old snapshot's ids in order. The ids are checked
//!   at every position so a reordered response is reported instead of
//!   misattributing renames.
//! - [`diff_by_id`] re-keys both snapshots by member id and also reports who
//!   left and who joined. The cycle controller falls back to it when the
//!   aligned diff reports misalignment.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{IdentityChange, KeyedDiff, MemberId, Snapshot};

/// Error type for the aligned diff.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// The new snapshot does not have one row per old row.
    ///
    /// `partial` holds the changes found over the common prefix; nothing is
    /// reported for positions past the shorter snapshot.
    #[error("Snapshot length mismatch: expected {expected} rows, got {actual}")]
    LengthMismatch {
        /// Rows in the old snapshot.
        expected: usize,
        /// Rows in the new snapshot.
        actual: usize,
        /// Changes over `0..min(expected, actual)`.
        partial: Vec<IdentityChange>,
    },
    /// Row order of the new snapshot does not follow the old one.
    #[error("Snapshot misaligned at position {position}: expected member {expected}, found {found}")]
    Misaligned {
        /// First position whose ids disagree.
        position: usize,
        /// Id held by the old snapshot.
        expected: MemberId,
        /// Id returned in the new snapshot.
        found: MemberId,
    },
}

/// Position-aligned diff of two snapshots.
///
/// Emits one [`IdentityChange`] per position whose display name differs, in
/// position order. Never reads past the end of either snapshot.
pub fn diff(old: &Snapshot, new: &Snapshot) -> Result<Vec<IdentityChange>, DiffError> {
    let mut changes = Vec::new();

    for (position, (before, after)) in old.entries().iter().zip(new.entries()).enumerate() {
        if before.id != after.id {
            return Err(DiffError::Misaligned {
                position,
                expected: before.id,
                found: after.id,
            });
        }
        if before.display_name != after.display_name {
            changes.push(IdentityChange::new(
                before.display_name.clone(),
                after.display_name.clone(),
            ));
        }
    }

    if old.len() != new.len() {
        return Err(DiffError::LengthMismatch {
            expected: old.len(),
            actual: new.len(),
            partial: changes,
        });
    }

    Ok(changes)
}

/// Diff keyed by member id.
///
/// Renames follow the old snapshot's order, `left` keeps the old order and
/// `joined` keeps the new order. Duplicate ids in `new` resolve to the last
/// row.
pub fn diff_by_id(old: &Snapshot, new: &Snapshot) -> KeyedDiff {
    let new_names: BTreeMap<MemberId, &str> = new
        .entries()
        .iter()
        .map(|e| (e.id, e.display_name.as_str()))
        .collect();
    let old_ids: BTreeSet<MemberId> = old.entries().iter().map(|e| e.id).collect();

    let mut result = KeyedDiff::default();

    for entry in old.entries() {
        match new_names.get(&entry.id) {
            Some(name) if *name != entry.display_name => {
                result
                    .changes
                    .push(IdentityChange::new(entry.display_name.clone(), *name));
            }
            Some(_) => {}
            None => result.left.push(entry.id),
        }
    }

    let mut seen = BTreeSet::new();
    for entry in new.entries() {
        if !old_ids.contains(&entry.id) && seen.insert(entry.id) {
            result.joined.push(entry.clone());
        }
    }

    result
}
