//! Property-based tests for common-snapshot resolution.
//!
//! Histories are built from sets of snapshot numbers. A number always maps
//! to the same snapshot and larger numbers are newer, so the expected
//! common snapshot is simply the largest shared number.

use std::collections::BTreeSet;

use proptest::prelude::*;
use snapclone_core::{latest_common, latest_common_indices, ResolutionError, SnapshotHistory};

use crate::harness::{history, snapshot_numbered};

/// Generator for a set of snapshot numbers.
pub fn snapshot_numbers(max_len: usize) -> impl Strategy<Value = BTreeSet<u32>> {
    proptest::collection::btree_set(0u32..40, 0..max_len)
}

/// Newest-first history of the numbered snapshots in `numbers`.
pub fn history_of(numbers: &BTreeSet<u32>) -> SnapshotHistory {
    history(numbers.iter().copied().map(snapshot_numbered).collect())
}

/// Expected classification, computed from the number sets.
pub fn expected(
    source: &BTreeSet<u32>,
    target: &BTreeSet<u32>,
) -> Result<u32, ResolutionErrorKind> {
    let common = source
        .intersection(target)
        .max()
        .copied()
        .ok_or(ResolutionErrorKind::NoCommon)?;
    let source_newest = source.iter().max().copied();
    let target_newest = target.iter().max().copied();
    if Some(common) == source_newest && Some(common) == target_newest {
        return Err(ResolutionErrorKind::InSync);
    }
    if Some(common) == source_newest {
        return Err(ResolutionErrorKind::TargetAhead);
    }
    Ok(common)
}

/// [`ResolutionError`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionErrorKind {
    /// No shared snapshot.
    NoCommon,
    /// Same newest snapshot.
    InSync,
    /// Target has snapshots past source's newest.
    TargetAhead,
}

impl From<&ResolutionError> for ResolutionErrorKind {
    fn from(e: &ResolutionError) -> Self {
        match e {
            ResolutionError::NoCommonSnapshot => ResolutionErrorKind::NoCommon,
            ResolutionError::AlreadyInSync { .. } => ResolutionErrorKind::InSync,
            ResolutionError::TargetAheadOfSource { .. } => ResolutionErrorKind::TargetAhead,
        }
    }
}

proptest! {
    /// Test: resolution agrees with the set model for arbitrary histories.
    #[test]
    fn test_latest_common_matches_model(
        source in snapshot_numbers(15),
        target in snapshot_numbers(15),
    ) {
        let got = latest_common(&history_of(&source), &history_of(&target));
        let got = got
            .map(|s| s.id)
            .map_err(|e| ResolutionErrorKind::from(&e));
        let want = expected(&source, &target).map(|n| snapshot_numbered(n).id);
        prop_assert_eq!(got, want);
    }

    /// Test: histories with no shared id never resolve.
    #[test]
    fn test_disjoint_histories(numbers in snapshot_numbers(20)) {
        let (source, target): (BTreeSet<u32>, BTreeSet<u32>) =
            numbers.into_iter().partition(|n| n % 2 == 0);
        let got = latest_common(&history_of(&source), &history_of(&target));
        prop_assert_eq!(got, Err(ResolutionError::NoCommonSnapshot));
    }

    /// Test: a shared newest snapshot is always reported as in sync.
    #[test]
    fn test_same_newest_is_in_sync(
        source in snapshot_numbers(10),
        target in snapshot_numbers(10),
    ) {
        let mut source = source;
        let mut target = target;
        source.insert(40);
        target.insert(40);
        let got = latest_common(&history_of(&source), &history_of(&target));
        let is_expected = matches!(got, Err(ResolutionError::AlreadyInSync { .. }));
        prop_assert!(is_expected);
    }

    /// Test: a target holding only source's newest plus newer snapshots is ahead.
    #[test]
    fn test_target_ahead(
        older in snapshot_numbers(10),
        newer in proptest::collection::btree_set(41u32..60, 1..5),
    ) {
        let mut source = older;
        source.insert(40);
        let mut target = newer;
        target.insert(40);
        let got = latest_common(&history_of(&source), &history_of(&target));
        let is_expected = matches!(got, Err(ResolutionError::TargetAheadOfSource { .. }));
        prop_assert!(is_expected);
    }

    /// Test: a resolved snapshot is strictly older than source's newest and
    /// is the first target snapshot found in source.
    #[test]
    fn test_resolved_index_invariants(
        source in snapshot_numbers(15),
        target in snapshot_numbers(15),
    ) {
        let sh = history_of(&source);
        let th = history_of(&target);
        if let Ok(common) = latest_common(&sh, &th) {
            let (si, ti) = latest_common_indices(&sh, &th).unwrap();
            prop_assert!(si > 0);
            prop_assert_eq!(sh.position(&common.id), Some(si));
            prop_assert_eq!(th.position(&common.id), Some(ti));
            for newer in th.iter().take(ti) {
                prop_assert!(!sh.contains(&newer.id));
            }
        }
    }
}
