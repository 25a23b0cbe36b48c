//! Property-based tests for snapshot timestamp parsing and history ordering.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use snapclone_core::snapshot::NAME_TIMESTAMP_FORMAT;
use snapclone_core::{parse_time_from_name, validate_and_reverse, Snapshot, ValidationError};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap()
}

fn named(offset_secs: i64, id: usize) -> Snapshot {
    let at = base_time() + Duration::seconds(offset_secs);
    Snapshot::new(
        format!("com.apple.TimeMachine.{}.backup", at.format(NAME_TIMESTAMP_FORMAT)),
        format!("uuid-{}", id),
    )
}

/// Oldest-first snapshots with strictly increasing timestamps and unique ids.
fn oldest_first() -> impl Strategy<Value = Vec<Snapshot>> {
    proptest::collection::btree_set(0i64..10_000_000, 0..20).prop_map(|offsets| {
        offsets
            .into_iter()
            .enumerate()
            .map(|(i, off)| named(off, i))
            .collect()
    })
}

/// Names with no `dddd-dd-dd-dddddd` substring.
fn name_without_timestamp() -> impl Strategy<Value = String> {
    "[a-zA-Z._ -]{0,40}"
}

proptest! {
    /// Test: a validated oldest-first list comes back reversed.
    #[test]
    fn test_valid_order_is_reversed(snaps in oldest_first()) {
        let history = validate_and_reverse(snaps.clone()).unwrap();
        let mut expected = snaps;
        expected.reverse();
        prop_assert_eq!(history.as_slice(), expected.as_slice());
        prop_assert_eq!(history.newest(), expected.first());
    }

    /// Test: swapping two snapshots with different times is rejected.
    #[test]
    fn test_misordered_is_rejected(
        snaps in oldest_first().prop_filter("needs two snapshots", |s| s.len() >= 2),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut snaps = snaps;
        let i = pick.index(snaps.len() - 1);
        snaps.swap(i, i + 1);
        let err = validate_and_reverse(snaps).unwrap_err();
        prop_assert!(
            matches!(err, ValidationError::OutOfOrder { .. }),
            "unexpected error: {:?}",
            err
        );
    }

    /// Test: names without a timestamp never parse.
    #[test]
    fn test_missing_timestamp_fails(name in name_without_timestamp()) {
        let missing = matches!(
            parse_time_from_name(&name),
            Err(ValidationError::MissingTimestamp { .. })
        );
        prop_assert!(missing);
    }

    /// Test: the timestamp is found wherever it sits in the name.
    #[test]
    fn test_timestamp_anywhere(
        prefix in "[a-z._]{0,12}",
        suffix in "[a-z._]{0,12}",
        offset in 0i64..100_000_000,
    ) {
        let at = base_time() + Duration::seconds(offset);
        let name = format!("{}{}{}", prefix, at.format(NAME_TIMESTAMP_FORMAT), suffix);
        prop_assert_eq!(parse_time_from_name(&name).unwrap(), at);
    }

    /// Test: a snapshot without a derivable timestamp fails the whole list.
    #[test]
    fn test_unparsable_member_fails(
        snaps in oldest_first(),
        pick in any::<prop::sample::Index>(),
        bad in name_without_timestamp(),
    ) {
        let mut snaps = snaps;
        let at = if snaps.is_empty() { 0 } else { pick.index(snaps.len() + 1) };
        snaps.insert(at, Snapshot::new(bad, "uuid-bad"));
        prop_assert!(validate_and_reverse(snaps).is_err());
    }
}
