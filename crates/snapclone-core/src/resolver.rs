//! Common-snapshot resolution between a source and a target history.
//!
//! The common snapshot is the first snapshot, scanning target newest to
//! oldest, whose id also appears in source. Ties are broken by target's
//! order, not source's.
//!
//! Classification, in priority order:
//! 1. no shared id: [`ResolutionError::NoCommonSnapshot`]
//! 2. shared snapshot is the newest of both: [`ResolutionError::AlreadyInSync`]
//! 3. shared snapshot is source's newest only: [`ResolutionError::TargetAheadOfSource`]
//! 4. otherwise the shared snapshot, which is strictly older than source's newest
//!
//! Check 3 only looks at source's index. Whether it should instead compare
//! the source and target indices against each other is unresolved; the
//! behavior is kept as is until that is decided.

use crate::error::ResolutionError;
use crate::history::SnapshotHistory;
use crate::snapshot::Snapshot;

/// Indices (newest = 0) of the latest common snapshot in source and target.
pub fn latest_common_indices(
    source: &SnapshotHistory,
    target: &SnapshotHistory,
) -> Option<(usize, usize)> {
    for (target_index, ts) in target.iter().enumerate() {
        for (source_index, ss) in source.iter().enumerate() {
            if ss.id == ts.id {
                return Some((source_index, target_index));
            }
        }
    }
    None
}

/// Finds the snapshot to use as the diff base when cloning source's newest
/// snapshot onto target.
pub fn latest_common(
    source: &SnapshotHistory,
    target: &SnapshotHistory,
) -> Result<Snapshot, ResolutionError> {
    let (source_index, target_index) =
        latest_common_indices(source, target).ok_or(ResolutionError::NoCommonSnapshot)?;
    let common = source
        .get(source_index)
        .ok_or(ResolutionError::NoCommonSnapshot)?;

    if source_index == 0 && target_index == 0 {
        return Err(ResolutionError::AlreadyInSync {
            snapshot: common.to_string(),
        });
    }
    if source_index == 0 {
        return Err(ResolutionError::TargetAheadOfSource {
            snapshot: common.to_string(),
        });
    }
    Ok(common.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(snaps: &[(&str, &str)]) -> SnapshotHistory {
        // Input is given newest first, as the resolver sees it.
        let oldest_first = snaps
            .iter()
            .rev()
            .map(|(name, id)| Snapshot::new(*name, *id))
            .collect();
        SnapshotHistory::from_oldest_first(oldest_first).unwrap()
    }

    const S1: (&str, &str) = ("com.apple.TimeMachine.2021-03-01-203433.local", "s1");
    const S2: (&str, &str) = ("com.apple.TimeMachine.2021-03-01-203509.local", "s2");
    const S3: (&str, &str) = ("com.apple.TimeMachine.2021-03-02-080000.local", "s3");
    const T1: (&str, &str) = ("target-only-2021-03-01-210000", "t1");

    #[test]
    fn test_finds_older_common_snapshot() {
        let source = history(&[S2, S1]);
        let target = history(&[S1]);
        let common = latest_common(&source, &target).unwrap();
        assert_eq!(common.id, "s1");
        assert_eq!(latest_common_indices(&source, &target), Some((1, 0)));
    }

    #[test]
    fn test_prefers_latest_in_target_order() {
        let source = history(&[S3, S2, S1]);
        let target = history(&[S2, S1]);
        assert_eq!(latest_common(&source, &target).unwrap().id, "s2");
    }

    #[test]
    fn test_no_common_snapshot() {
        let source = history(&[S2, S1]);
        let target = history(&[T1]);
        assert_eq!(
            latest_common(&source, &target).unwrap_err(),
            ResolutionError::NoCommonSnapshot
        );
        assert_eq!(
            latest_common(&source, &SnapshotHistory::empty()).unwrap_err(),
            ResolutionError::NoCommonSnapshot
        );
        assert_eq!(
            latest_common(&SnapshotHistory::empty(), &target).unwrap_err(),
            ResolutionError::NoCommonSnapshot
        );
    }

    #[test]
    fn test_already_in_sync() {
        let source = history(&[S2, S1]);
        let target = history(&[S2, S1]);
        assert!(matches!(
            latest_common(&source, &target).unwrap_err(),
            ResolutionError::AlreadyInSync { .. }
        ));
    }

    #[test]
    fn test_target_ahead_of_source() {
        let source = history(&[S1]);
        let target = history(&[T1, S1]);
        assert!(matches!(
            latest_common(&source, &target).unwrap_err(),
            ResolutionError::TargetAheadOfSource { .. }
        ));
    }

    #[test]
    fn test_target_diverged_after_older_common() {
        // Target has its own newer snapshot, but the common snapshot is older
        // than source's newest, so the ahead check does not trigger.
        let source = history(&[S2, S1]);
        let target = history(&[T1, S1]);
        assert_eq!(latest_common(&source, &target).unwrap().id, "s1");
    }
}
