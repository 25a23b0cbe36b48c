//! In-memory volumes implementing both collaborator traits.
//!
//! Behaves like `diskutil` and `asr` do on real devices:
//! - Volumes are looked up by id, name, mount point or device reference.
//! - Mutating calls address the volume by its device reference, so a stale
//!   [`Volume`] fails the same way a stale device node would.
//! - A restore renames the target to the source's name. An incremental
//!   restore remounts it under a new device reference. A destructive restore
//!   keeps the device but gives the volume a new id.
//!
//! Every restore is recorded for assertions.

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{ExecError, MetadataError, RestoreError};
use crate::provider::{Restorer, VolumeMetadataProvider};
use crate::snapshot::Snapshot;
use crate::volume::Volume;

/// A restore received by [`InMemoryDevices`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreCall {
    /// Incremental restore.
    Incremental {
        /// Source volume id.
        source: String,
        /// Target volume id.
        target: String,
        /// Snapshot id restored to.
        to: String,
        /// Snapshot id restored from.
        from: String,
    },
    /// Destructive restore.
    Destructive {
        /// Source volume id.
        source: String,
        /// Target volume id.
        target: String,
        /// Snapshot id restored to.
        to: String,
    },
}

#[derive(Debug, Clone)]
struct Entry {
    volume: Volume,
    // Oldest first, as a provider lists them.
    snapshots: Vec<Snapshot>,
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<Entry>,
    restores: Vec<RestoreCall>,
    restore_failure: Option<String>,
    rename_failure: Option<String>,
    next_disk: u32,
    next_id: u32,
}

impl State {
    fn find(&self, locator: &str) -> Option<usize> {
        self.entries.iter().position(|e| {
            let v = &e.volume;
            v.id == locator
                || v.name == locator
                || v.device_reference == locator
                || v.mount_point.as_deref() == Some(locator)
        })
    }

    fn by_device(&self, volume: &Volume) -> Result<usize, MetadataError> {
        self.entries
            .iter()
            .position(|e| e.volume.device_reference == volume.device_reference)
            .ok_or_else(|| MetadataError::VolumeNotFound {
                locator: volume.device_reference.clone(),
            })
    }

    fn rename(&mut self, idx: usize, name: &str) {
        let volume = &mut self.entries[idx].volume;
        volume.name = name.to_string();
        if volume.mount_point.is_some() {
            volume.mount_point = Some(format!("/Volumes/{}", name));
        }
    }

    fn remount(&mut self, idx: usize) {
        self.next_disk += 1;
        self.entries[idx].volume.device_reference = format!("/dev/disk{}s1", 100 + self.next_disk);
    }

    fn restore_indices(&self, source: &Volume, target: &Volume) -> Result<(usize, usize), RestoreError> {
        if let Some(reason) = &self.restore_failure {
            return Err(RestoreError::Rejected {
                reason: reason.clone(),
            });
        }
        let lookup = |v: &Volume| {
            self.by_device(v).map_err(|e| RestoreError::Rejected {
                reason: e.to_string(),
            })
        };
        Ok((lookup(source)?, lookup(target)?))
    }

    fn require_snapshot(&self, idx: usize, snap: &Snapshot) -> Result<(), RestoreError> {
        let entry = &self.entries[idx];
        if entry.snapshots.iter().any(|s| s.id == snap.id) {
            Ok(())
        } else {
            Err(RestoreError::Rejected {
                reason: format!("snapshot {} not found on {}", snap, entry.volume),
            })
        }
    }

    fn rename_to_source(&mut self, src: usize, tgt: usize) {
        let source_name = self.entries[src].volume.name.clone();
        self.rename(tgt, &source_name);
    }

    fn reassign_id(&mut self, idx: usize) {
        self.next_id += 1;
        self.entries[idx].volume.id = format!("restored-{}", self.next_id);
    }
}

/// In-memory devices serving as metadata provider and restorer.
#[derive(Debug, Default)]
pub struct InMemoryDevices {
    state: Mutex<State>,
}

impl InMemoryDevices {
    /// Creates an empty device set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces, by id) a volume with snapshots given oldest first.
    pub fn with_volume(self, volume: Volume, snapshots: Vec<Snapshot>) -> Self {
        {
            let mut state = self.state.lock();
            state.entries.retain(|e| e.volume.id != volume.id);
            state.entries.push(Entry { volume, snapshots });
        }
        self
    }

    /// Makes every subsequent restore fail with `reason`.
    pub fn fail_restores(&self, reason: &str) {
        self.state.lock().restore_failure = Some(reason.to_string());
    }

    /// Makes every subsequent rename fail with `reason`.
    pub fn fail_renames(&self, reason: &str) {
        self.state.lock().rename_failure = Some(reason.to_string());
    }

    /// Current metadata of the volume matching `locator`.
    pub fn volume(&self, locator: &str) -> Option<Volume> {
        let state = self.state.lock();
        state.find(locator).map(|i| state.entries[i].volume.clone())
    }

    /// Snapshot ids of the volume matching `locator`, newest first.
    pub fn snapshot_ids(&self, locator: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .find(locator)
            .map(|i| {
                state.entries[i]
                    .snapshots
                    .iter()
                    .rev()
                    .map(|s| s.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Restores received so far.
    pub fn restores(&self) -> Vec<RestoreCall> {
        self.state.lock().restores.clone()
    }
}

impl VolumeMetadataProvider for InMemoryDevices {
    fn info(&self, locator: &str) -> Result<Volume, MetadataError> {
        self.volume(locator)
            .ok_or_else(|| MetadataError::VolumeNotFound {
                locator: locator.to_string(),
            })
    }

    fn list_snapshots(&self, volume: &Volume) -> Result<Vec<Snapshot>, MetadataError> {
        let state = self.state.lock();
        let idx = state.by_device(volume)?;
        Ok(state.entries[idx].snapshots.clone())
    }

    fn rename(&self, volume: &Volume, new_name: &str) -> Result<(), MetadataError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.rename_failure {
            return Err(MetadataError::Exec(ExecError::Failed {
                command: format!("rename {} {}", volume.device_reference, new_name),
                status: "exit status: 1".to_string(),
                stdout: Vec::new(),
                stderr: reason.clone(),
            }));
        }
        let idx = state.by_device(volume)?;
        debug!(volume = %volume, new_name = %new_name, "renaming in-memory volume");
        state.rename(idx, new_name);
        Ok(())
    }

    fn delete_snapshot(&self, volume: &Volume, snapshot: &Snapshot) -> Result<(), MetadataError> {
        let mut state = self.state.lock();
        let idx = state.by_device(volume)?;
        let entry = &mut state.entries[idx];
        let before = entry.snapshots.len();
        entry.snapshots.retain(|s| s.id != snapshot.id);
        if entry.snapshots.len() == before {
            return Err(MetadataError::SnapshotNotFound {
                volume: entry.volume.to_string(),
                snapshot: snapshot.to_string(),
            });
        }
        Ok(())
    }
}

impl Restorer for InMemoryDevices {
    fn restore(
        &self,
        source: &Volume,
        target: &Volume,
        to: &Snapshot,
        from: &Snapshot,
    ) -> Result<(), RestoreError> {
        let mut state = self.state.lock();
        let (src, tgt) = state.restore_indices(source, target)?;
        state.require_snapshot(src, from)?;
        state.require_snapshot(tgt, from)?;
        state.require_snapshot(src, to)?;

        state.restores.push(RestoreCall::Incremental {
            source: source.id.clone(),
            target: target.id.clone(),
            to: to.id.clone(),
            from: from.id.clone(),
        });
        let to_snap = state.entries[src]
            .snapshots
            .iter()
            .find(|s| s.id == to.id)
            .cloned()
            .unwrap_or_else(|| to.clone());
        let entry = &mut state.entries[tgt];
        if !entry.snapshots.iter().any(|s| s.id == to.id) {
            entry.snapshots.push(to_snap);
            entry.snapshots.sort_by_key(|s| s.created().ok());
        }
        state.rename_to_source(src, tgt);
        state.remount(tgt);
        Ok(())
    }

    fn destructive_restore(
        &self,
        source: &Volume,
        target: &Volume,
        to: &Snapshot,
    ) -> Result<(), RestoreError> {
        let mut state = self.state.lock();
        let (src, tgt) = state.restore_indices(source, target)?;
        state.require_snapshot(src, to)?;

        state.restores.push(RestoreCall::Destructive {
            source: source.id.clone(),
            target: target.id.clone(),
            to: to.id.clone(),
        });
        state.entries[tgt].snapshots = vec![to.clone()];
        state.rename_to_source(src, tgt);
        state.reassign_id(tgt);
        Ok(())
    }
}
