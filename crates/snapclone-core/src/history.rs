//! Snapshot history ordering.
//!
//! Providers list a volume's snapshots oldest-first. Every decision made by
//! the resolver assumes the most recent snapshot comes first, so the list is
//! checked against its creation times once and then reversed into a
//! [`SnapshotHistory`]. A misordered list is rejected rather than re-sorted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::snapshot::Snapshot;

/// A volume's snapshots, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotHistory {
    snapshots: Vec<Snapshot>,
}

impl SnapshotHistory {
    /// Creates an empty history.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validates an oldest-first provider listing and reverses it.
    pub fn from_oldest_first(snapshots: Vec<Snapshot>) -> Result<Self, ValidationError> {
        validate_and_reverse(snapshots)
    }

    /// The most recently created snapshot.
    pub fn newest(&self) -> Option<&Snapshot> {
        self.snapshots.first()
    }

    /// The least recently created snapshot.
    pub fn oldest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    /// Index of the snapshot with `id`, counting from the newest (0).
    pub fn position(&self, id: &str) -> Option<usize> {
        self.snapshots.iter().position(|s| s.id == id)
    }

    /// Returns true if a snapshot with `id` is present.
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Snapshot at `index`, counting from the newest.
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    /// Number of snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Returns true if the volume has no snapshots.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Iterates newest to oldest.
    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    /// Snapshots newest first.
    pub fn as_slice(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Consumes the history, returning snapshots newest first.
    pub fn into_vec(self) -> Vec<Snapshot> {
        self.snapshots
    }
}

impl<'a> IntoIterator for &'a SnapshotHistory {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}

fn check_oldest_first(snapshots: &[Snapshot]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(snapshots.len());
    let mut previous: Option<(&Snapshot, DateTime<Utc>)> = None;
    for snap in snapshots {
        let created = snap.created()?;
        if !seen.insert(snap.id.as_str()) {
            return Err(ValidationError::DuplicateSnapshot {
                id: snap.id.clone(),
            });
        }
        if let Some((prev, prev_created)) = previous {
            if created < prev_created {
                return Err(ValidationError::OutOfOrder {
                    snapshot: snap.to_string(),
                    previous: prev.to_string(),
                });
            }
        }
        previous = Some((snap, created));
    }

    Ok(())
}

/// Checks that `snapshots` is ordered oldest-first by creation time and
/// returns it newest-first.
///
/// Fails if a creation time cannot be derived, if an id repeats, or if any
/// snapshot was created before the one listed ahead of it. Equal creation
/// times are accepted in the order given.
pub fn validate_and_reverse(snapshots: Vec<Snapshot>) -> Result<SnapshotHistory, ValidationError> {
    check_oldest_first(&snapshots)?;

    let mut snapshots = snapshots;
    snapshots.reverse();
    Ok(SnapshotHistory { snapshots })
}
