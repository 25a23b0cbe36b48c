//! Pre-flight cloneability checks.
//!
//! Every check here is pure: it runs over metadata already read from the
//! provider and never touches a volume. The orchestrator re-reads metadata
//! and re-checks what it relies on before mutating anything.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::history::SnapshotHistory;
use crate::resolver;
use crate::volume::Volume;

/// How a target is brought up to date with the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneMode {
    /// Restore only the diff between the common snapshot and source's newest.
    #[default]
    Incremental,
    /// Erase the target and restore source's newest snapshot in full.
    Initialize,
}

/// A volume together with its validated snapshot history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSnapshots {
    /// Volume metadata.
    pub volume: Volume,
    /// Snapshots, newest first.
    pub history: SnapshotHistory,
}

impl VolumeSnapshots {
    /// Pairs a volume with its history.
    pub fn new(volume: Volume, history: SnapshotHistory) -> Self {
        Self { volume, history }
    }
}

/// Checks that `source` can be cloned from.
///
/// With `require_snapshots`, a source without snapshots is rejected.
pub fn validate_source(
    source: &VolumeSnapshots,
    require_snapshots: bool,
) -> Result<(), ValidationError> {
    let volume = &source.volume;
    if !volume.filesystem_kind.is_copy_on_write() {
        return Err(ValidationError::NotCopyOnWrite {
            volume: volume.name.clone(),
            kind: volume.filesystem_kind.to_string(),
        });
    }
    if require_snapshots && source.history.is_empty() {
        return Err(ValidationError::NoSnapshots {
            volume: volume.name.clone(),
        });
    }
    Ok(())
}

/// Checks that `target` can be cloned to.
pub fn validate_target(target: &Volume) -> Result<(), ValidationError> {
    if !target.filesystem_kind.is_copy_on_write() {
        return Err(ValidationError::NotCopyOnWrite {
            volume: target.name.clone(),
            kind: target.filesystem_kind.to_string(),
        });
    }
    if !target.writable {
        return Err(ValidationError::NotWritable {
            volume: target.name.clone(),
        });
    }
    Ok(())
}

/// Checks that `source` can be cloned onto `target` in `mode`.
pub fn validate_pair(
    source: &VolumeSnapshots,
    target: &VolumeSnapshots,
    mode: CloneMode,
) -> Result<(), ValidationError> {
    if source.volume.id == target.volume.id {
        return Err(ValidationError::SameVolume {
            id: source.volume.id.clone(),
        });
    }
    // A restore across variants would silently reformat the target.
    if source.volume.filesystem_variant != target.volume.filesystem_variant {
        return Err(ValidationError::VariantMismatch {
            source_variant: source.volume.filesystem_variant.clone(),
            target_variant: target.volume.filesystem_variant.clone(),
        });
    }
    match mode {
        CloneMode::Incremental => {
            resolver::latest_common(&source.history, &target.history)?;
        }
        CloneMode::Initialize => {
            if !target.history.is_empty() {
                return Err(ValidationError::TargetNotEmpty {
                    volume: target.volume.name.clone(),
                    snapshots: target.history.len(),
                });
            }
        }
    }
    Ok(())
}

/// Validates `source` once, rejects duplicate targets, then validates every
/// target against source in order.
///
/// `targets` pairs each target with the locator the caller used for it, so
/// duplicates can be reported by the names the caller gave.
pub fn validate_many(
    source: &VolumeSnapshots,
    targets: &[(String, VolumeSnapshots)],
    mode: CloneMode,
) -> Result<(), ValidationError> {
    validate_source(source, true)?;

    let mut seen: HashMap<&str, &str> = HashMap::with_capacity(targets.len());
    for (locator, target) in targets {
        if let Some(first) = seen.insert(target.volume.id.as_str(), locator.as_str()) {
            return Err(ValidationError::DuplicateTarget {
                id: target.volume.id.clone(),
                first: first.to_string(),
                second: locator.clone(),
            });
        }
    }
    for (_, target) in targets {
        validate_target(&target.volume)?;
        validate_pair(source, target, mode)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolutionError;
    use crate::snapshot::Snapshot;
    use crate::volume::FilesystemKind;

    fn volume(id: &str, name: &str, writable: bool) -> Volume {
        Volume {
            id: id.to_string(),
            name: name.to_string(),
            device_reference: format!("/dev/{}", id),
            mount_point: Some(format!("/Volumes/{}", name)),
            writable,
            filesystem_kind: FilesystemKind::CopyOnWrite,
            filesystem_variant: "APFS".to_string(),
        }
    }

    fn with_snaps(volume: Volume, oldest_first: &[(&str, &str)]) -> VolumeSnapshots {
        let snaps = oldest_first
            .iter()
            .map(|(name, id)| Snapshot::new(*name, *id))
            .collect();
        VolumeSnapshots::new(volume, SnapshotHistory::from_oldest_first(snaps).unwrap())
    }

    const S1: (&str, &str) = ("snap-2021-03-01-203433", "s1");
    const S2: (&str, &str) = ("snap-2021-03-01-203509", "s2");

    fn source() -> VolumeSnapshots {
        with_snaps(volume("src", "Source", false), &[S1, S2])
    }

    fn target() -> VolumeSnapshots {
        with_snaps(volume("tgt", "Target", true), &[S1])
    }

    #[test]
    fn test_incremental_pair_ok() {
        validate_pair(&source(), &target(), CloneMode::Incremental).unwrap();
        validate_many(
            &source(),
            &[("Target".to_string(), target())],
            CloneMode::Incremental,
        )
        .unwrap();
    }

    #[test]
    fn test_source_must_be_cow() {
        let mut src = source();
        src.volume.filesystem_kind = FilesystemKind::Other("hfs".to_string());
        assert!(matches!(
            validate_source(&src, false).unwrap_err(),
            ValidationError::NotCopyOnWrite { .. }
        ));
    }

    #[test]
    fn test_source_requires_snapshots_only_when_asked() {
        let src = with_snaps(volume("src", "Source", false), &[]);
        validate_source(&src, false).unwrap();
        assert!(matches!(
            validate_source(&src, true).unwrap_err(),
            ValidationError::NoSnapshots { .. }
        ));
    }

    #[test]
    fn test_target_must_be_writable_cow() {
        let mut tgt = volume("tgt", "Target", false);
        assert!(matches!(
            validate_target(&tgt).unwrap_err(),
            ValidationError::NotWritable { .. }
        ));
        tgt.writable = true;
        tgt.filesystem_kind = FilesystemKind::Other("hfs".to_string());
        assert!(matches!(
            validate_target(&tgt).unwrap_err(),
            ValidationError::NotCopyOnWrite { .. }
        ));
    }

    #[test]
    fn test_self_clone_rejected() {
        let src = source();
        assert!(matches!(
            validate_pair(&src, &src, CloneMode::Incremental).unwrap_err(),
            ValidationError::SameVolume { .. }
        ));
    }

    #[test]
    fn test_variant_mismatch_rejected_regardless_of_overlap() {
        let mut tgt = target();
        tgt.volume.filesystem_variant = "Case-sensitive APFS".to_string();
        for mode in [CloneMode::Incremental, CloneMode::Initialize] {
            assert!(matches!(
                validate_pair(&source(), &tgt, mode).unwrap_err(),
                ValidationError::VariantMismatch { .. }
            ));
        }
    }

    #[test]
    fn test_incremental_propagates_resolution() {
        let tgt = with_snaps(volume("tgt", "Target", true), &[S1, S2]);
        assert_eq!(
            validate_pair(&source(), &tgt, CloneMode::Incremental).unwrap_err(),
            ValidationError::Resolution(ResolutionError::AlreadyInSync {
                snapshot: "snap-2021-03-01-203509 (s2)".to_string()
            })
        );
    }

    #[test]
    fn test_initialize_requires_empty_target() {
        assert_eq!(
            validate_pair(&source(), &target(), CloneMode::Initialize).unwrap_err(),
            ValidationError::TargetNotEmpty {
                volume: "Target".to_string(),
                snapshots: 1,
            }
        );
        let empty = with_snaps(volume("tgt", "Target", true), &[]);
        validate_pair(&source(), &empty, CloneMode::Initialize).unwrap();
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let targets = vec![
            ("Target".to_string(), target()),
            ("/Volumes/Target".to_string(), target()),
        ];
        assert_eq!(
            validate_many(&source(), &targets, CloneMode::Incremental).unwrap_err(),
            ValidationError::DuplicateTarget {
                id: "tgt".to_string(),
                first: "Target".to_string(),
                second: "/Volumes/Target".to_string(),
            }
        );
    }

    #[test]
    fn test_many_reports_duplicates_before_pair_errors() {
        let read_only = with_snaps(volume("ro", "ReadOnly", false), &[S1]);
        let targets = vec![
            ("ReadOnly".to_string(), read_only.clone()),
            ("/Volumes/ReadOnly".to_string(), read_only),
        ];
        assert!(matches!(
            validate_many(&source(), &targets, CloneMode::Incremental).unwrap_err(),
            ValidationError::DuplicateTarget { .. }
        ));
    }

    #[test]
    fn test_many_fails_on_first_bad_target() {
        let read_only = with_snaps(volume("ro", "ReadOnly", false), &[S1]);
        let other = with_snaps(volume("other", "Other", true), &[]);
        let targets = vec![
            ("Target".to_string(), target()),
            ("ReadOnly".to_string(), read_only),
            ("Other".to_string(), other),
        ];
        assert!(matches!(
            validate_many(&source(), &targets, CloneMode::Incremental).unwrap_err(),
            ValidationError::NotWritable { .. }
        ));
    }

    #[test]
    fn test_many_requires_source_snapshots() {
        let src = with_snaps(volume("src", "Source", false), &[]);
        let tgt = with_snaps(volume("tgt", "Target", true), &[]);
        assert!(matches!(
            validate_many(&src, &[("Target".to_string(), tgt)], CloneMode::Initialize)
                .unwrap_err(),
            ValidationError::NoSnapshots { .. }
        ));
    }
}
