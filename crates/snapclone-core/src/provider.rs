//! Collaborator interfaces consumed by the clone orchestrator.
//!
//! Implementations:
//!
//! | trait | process-backed | dry run | in memory |
//! |---|---|---|---|
//! | [`VolumeMetadataProvider`] | [`crate::diskutil::DiskUtil`] | [`crate::dryrun::DryRunProvider`] | [`crate::memory::InMemoryDevices`] |
//! | [`Restorer`] | [`crate::asr::Asr`] | [`crate::dryrun::DryRunRestorer`] | [`crate::memory::InMemoryDevices`] |

use std::sync::Arc;

use crate::error::{MetadataError, RestoreError};
use crate::snapshot::Snapshot;
use crate::volume::Volume;

/// Reads and modifies volume and snapshot metadata.
pub trait VolumeMetadataProvider {
    /// Looks up a volume by name, id, mount point or device reference.
    fn info(&self, locator: &str) -> Result<Volume, MetadataError>;

    /// Lists a volume's snapshots in the provider's order, which must be
    /// oldest first.
    fn list_snapshots(&self, volume: &Volume) -> Result<Vec<Snapshot>, MetadataError>;

    /// Renames a volume.
    fn rename(&self, volume: &Volume, new_name: &str) -> Result<(), MetadataError>;

    /// Deletes a snapshot from a volume.
    fn delete_snapshot(&self, volume: &Volume, snapshot: &Snapshot) -> Result<(), MetadataError>;
}

/// Restores a target volume to one of a source volume's snapshots.
pub trait Restorer {
    /// Restores `target` to source's `to` snapshot using the diff from
    /// `from`. Both snapshots must exist in source and `from` must exist in
    /// target.
    fn restore(
        &self,
        source: &Volume,
        target: &Volume,
        to: &Snapshot,
        from: &Snapshot,
    ) -> Result<(), RestoreError>;

    /// Erases `target` and restores it to source's `to` snapshot. All
    /// previous data and snapshots on target are lost.
    fn destructive_restore(
        &self,
        source: &Volume,
        target: &Volume,
        to: &Snapshot,
    ) -> Result<(), RestoreError>;
}

macro_rules! forward_provider {
    ($ty:ty) => {
        impl<T: VolumeMetadataProvider + ?Sized> VolumeMetadataProvider for $ty {
            fn info(&self, locator: &str) -> Result<Volume, MetadataError> {
                (**self).info(locator)
            }
            fn list_snapshots(&self, volume: &Volume) -> Result<Vec<Snapshot>, MetadataError> {
                (**self).list_snapshots(volume)
            }
            fn rename(&self, volume: &Volume, new_name: &str) -> Result<(), MetadataError> {
                (**self).rename(volume, new_name)
            }
            fn delete_snapshot(
                &self,
                volume: &Volume,
                snapshot: &Snapshot,
            ) -> Result<(), MetadataError> {
                (**self).delete_snapshot(volume, snapshot)
            }
        }
    };
}

macro_rules! forward_restorer {
    ($ty:ty) => {
        impl<T: Restorer + ?Sized> Restorer for $ty {
            fn restore(
                &self,
                source: &Volume,
                target: &Volume,
                to: &Snapshot,
                from: &Snapshot,
            ) -> Result<(), RestoreError> {
                (**self).restore(source, target, to, from)
            }
            fn destructive_restore(
                &self,
                source: &Volume,
                target: &Volume,
                to: &Snapshot,
            ) -> Result<(), RestoreError> {
                (**self).destructive_restore(source, target, to)
            }
        }
    };
}

forward_provider!(&T);
forward_provider!(Box<T>);
forward_provider!(Arc<T>);
forward_restorer!(&T);
forward_restorer!(Box<T>);
forward_restorer!(Arc<T>);
