//! Dry-run collaborators.
//!
//! [`DryRunProvider`] delegates every read to the wrapped provider and turns
//! renames and snapshot deletions into logged no-ops. [`DryRunRestorer`]
//! logs the restore it would have run. A cloner built from these performs
//! exactly the reads of a real clone and changes nothing.

use tracing::info;

use crate::error::{MetadataError, RestoreError};
use crate::provider::{Restorer, VolumeMetadataProvider};
use crate::snapshot::Snapshot;
use crate::volume::Volume;

/// Read-through provider that never mutates.
#[derive(Debug, Clone)]
pub struct DryRunProvider<P> {
    inner: P,
}

impl<P: VolumeMetadataProvider> DryRunProvider<P> {
    /// Wraps `inner`.
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: VolumeMetadataProvider> VolumeMetadataProvider for DryRunProvider<P> {
    fn info(&self, locator: &str) -> Result<Volume, MetadataError> {
        self.inner.info(locator)
    }

    fn list_snapshots(&self, volume: &Volume) -> Result<Vec<Snapshot>, MetadataError> {
        self.inner.list_snapshots(volume)
    }

    fn rename(&self, volume: &Volume, new_name: &str) -> Result<(), MetadataError> {
        info!(volume = %volume, new_name = %new_name, "dry run: skipping rename");
        Ok(())
    }

    fn delete_snapshot(&self, volume: &Volume, snapshot: &Snapshot) -> Result<(), MetadataError> {
        info!(volume = %volume, snapshot = %snapshot, "dry run: skipping snapshot deletion");
        Ok(())
    }
}

/// Restorer that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRestorer;

impl DryRunRestorer {
    /// Creates a dry-run restorer.
    pub fn new() -> Self {
        Self
    }
}

impl Restorer for DryRunRestorer {
    fn restore(
        &self,
        source: &Volume,
        target: &Volume,
        to: &Snapshot,
        from: &Snapshot,
    ) -> Result<(), RestoreError> {
        info!(
            source = %source,
            target = %target,
            to = %to,
            from = %from,
            "dry run: skipping restore; restore completed successfully"
        );
        Ok(())
    }

    fn destructive_restore(
        &self,
        source: &Volume,
        target: &Volume,
        to: &Snapshot,
    ) -> Result<(), RestoreError> {
        info!(
            source = %source,
            target = %target,
            to = %to,
            "dry run: skipping destructive restore; restore completed successfully"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ScriptedRunner;
    use crate::diskutil::DiskUtil;
    use std::sync::Arc;

    #[test]
    fn test_mutations_do_not_reach_inner() {
        let runner = Arc::new(ScriptedRunner::new());
        let dry = DryRunProvider::new(DiskUtil::new(runner.clone()));
        let vol: Volume = serde_json::from_str(r#"{"VolumeUUID": "u"}"#).unwrap();
        dry.rename(&vol, "new").unwrap();
        dry.delete_snapshot(&vol, &Snapshot::new("s", "id")).unwrap();
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_reads_reach_inner() {
        let runner = Arc::new(ScriptedRunner::new().fail("diskutil", "", "no such volume"));
        let dry = DryRunProvider::new(DiskUtil::new(runner.clone()));
        assert!(dry.info("missing").is_err());
        assert_eq!(runner.calls_to("diskutil").len(), 1);
    }

    #[test]
    fn test_restorer_reports_success() {
        let vol: Volume = serde_json::from_str(r#"{"VolumeUUID": "u"}"#).unwrap();
        let snap = Snapshot::new("s", "id");
        DryRunRestorer::new().restore(&vol, &vol, &snap, &snap).unwrap();
        DryRunRestorer::new().destructive_restore(&vol, &vol, &snap).unwrap();
    }
}
