//! Test Harness - shared volume and snapshot fixtures

use chrono::{Duration, TimeZone, Utc};
use snapclone_core::snapshot::NAME_TIMESTAMP_FORMAT;
use snapclone_core::{
    validate_and_reverse, FilesystemKind, InMemoryDevices, Snapshot, SnapshotHistory, Volume,
};

/// Id of the source volume created by [`devices`].
pub const SOURCE_ID: &str = "source-uuid";

/// Filesystem variant of fixture volumes.
pub const DEFAULT_VARIANT: &str = "APFS";

/// Snapshot named like a Time Machine snapshot taken at `timestamp`
/// (`YYYY-MM-DD-HHMMSS`).
pub fn snapshot_at(timestamp: &str, id: &str) -> Snapshot {
    Snapshot::new(format!("com.apple.TimeMachine.{}.local", timestamp), id)
}

/// Snapshot `n`, timestamped `n` minutes after a fixed epoch. Equal `n`
/// gives equal snapshots, so histories built from numbers share ids.
pub fn snapshot_numbered(n: u32) -> Snapshot {
    let base = Utc
        .with_ymd_and_hms(2021, 3, 1, 0, 0, 0)
        .single()
        .expect("fixed epoch");
    let at = base + Duration::minutes(i64::from(n));
    snapshot_at(&at.format(NAME_TIMESTAMP_FORMAT).to_string(), &format!("snap-{}", n))
}

/// Writable APFS volume mounted under `/Volumes/<name>`.
pub fn apfs_volume(id: &str, name: &str, disk: u32) -> Volume {
    Volume {
        id: id.to_string(),
        name: name.to_string(),
        device_reference: format!("/dev/disk{}s1", disk),
        mount_point: Some(format!("/Volumes/{}", name)),
        writable: true,
        filesystem_kind: FilesystemKind::CopyOnWrite,
        filesystem_variant: DEFAULT_VARIANT.to_string(),
    }
}

/// Validated history from snapshots given oldest first.
pub fn history(oldest_first: Vec<Snapshot>) -> SnapshotHistory {
    validate_and_reverse(oldest_first).expect("fixture history is ordered")
}

/// Devices holding the source volume `Data` ([`SOURCE_ID`]) and one volume
/// per `(id, snapshots)` target, named `Offsite-<id>`. Snapshots are given
/// oldest first.
pub fn devices(source: Vec<Snapshot>, targets: Vec<(&str, Vec<Snapshot>)>) -> InMemoryDevices {
    let mut d = InMemoryDevices::new().with_volume(apfs_volume(SOURCE_ID, "Data", 2), source);
    for (i, (id, snaps)) in targets.into_iter().enumerate() {
        let name = format!("Offsite-{}", id);
        d = d.with_volume(apfs_volume(id, &name, 10 + i as u32), snaps);
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_snapshots_are_ordered() {
        let h = history((0..5).map(snapshot_numbered).collect());
        assert_eq!(h.newest().map(|s| s.id.as_str()), Some("snap-4"));
        assert_eq!(h.len(), 5);
    }

    #[test]
    fn test_devices_fixture() {
        let d = devices(vec![snapshot_numbered(1)], vec![("t1", Vec::new())]);
        assert_eq!(d.volume("Data").unwrap().id, SOURCE_ID);
        assert_eq!(d.volume("Offsite-t1").unwrap().id, "t1");
        assert!(d.snapshot_ids("t1").is_empty());
    }
}
