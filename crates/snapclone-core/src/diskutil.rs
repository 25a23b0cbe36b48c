//! Volume metadata provider backed by macOS `diskutil`.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ExecError, MetadataError};
use crate::exec::{CommandRunner, Invocation};
use crate::plist::PlistDecoder;
use crate::provider::VolumeMetadataProvider;
use crate::snapshot::Snapshot;
use crate::volume::Volume;

/// Default `diskutil` program.
pub const DEFAULT_DISKUTIL: &str = "diskutil";

#[derive(Debug, Deserialize)]
struct SnapshotList {
    #[serde(rename = "Snapshots", default)]
    snapshots: Vec<Snapshot>,
}

/// Reads and modifies volume metadata with `diskutil`.
#[derive(Clone)]
pub struct DiskUtil {
    runner: Arc<dyn CommandRunner>,
    plist: PlistDecoder,
    program: String,
}

impl DiskUtil {
    /// Creates a provider running `diskutil` and `plutil` through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let plist = PlistDecoder::new(runner.clone());
        Self::with_programs(runner, plist, DEFAULT_DISKUTIL)
    }

    /// Creates a provider with an explicit plist decoder and `diskutil` path.
    pub fn with_programs(
        runner: Arc<dyn CommandRunner>,
        plist: PlistDecoder,
        program: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            plist,
            program: program.into(),
        }
    }

    fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(&self.program).args(args)
    }

    /// Runs a `-plist` command and decodes its output. A failed command that
    /// printed a plist error document reports that document's message.
    fn run_and_decode<T: serde::de::DeserializeOwned>(
        &self,
        invocation: Invocation,
    ) -> Result<T, MetadataError> {
        let command = invocation.to_string();
        match self.runner.run(&invocation) {
            Ok(output) => self.plist.decode(&command, &output.stdout),
            Err(cause) => {
                let message = match &cause {
                    ExecError::Failed { stdout, .. } => self.plist.error_message(stdout),
                    _ => None,
                };
                Err(match message {
                    Some(message) => MetadataError::Tool {
                        command,
                        message,
                        cause,
                    },
                    None => MetadataError::Exec(cause),
                })
            }
        }
    }

    fn run_streaming(&self, invocation: Invocation) -> Result<(), MetadataError> {
        self.runner.run(&invocation.streaming())?;
        Ok(())
    }
}

impl std::fmt::Debug for DiskUtil {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskUtil")
            .field("program", &self.program)
            .field("plist", &self.plist)
            .finish_non_exhaustive()
    }
}

impl VolumeMetadataProvider for DiskUtil {
    fn info(&self, locator: &str) -> Result<Volume, MetadataError> {
        debug!(locator = %locator, "reading volume info");
        self.run_and_decode(self.invocation(["info", "-plist", locator]))
    }

    fn list_snapshots(&self, volume: &Volume) -> Result<Vec<Snapshot>, MetadataError> {
        debug!(volume = %volume, "listing snapshots");
        let list: SnapshotList = self.run_and_decode(self.invocation([
            "apfs",
            "listsnapshots",
            "-plist",
            volume.device_reference.as_str(),
        ]))?;
        Ok(list.snapshots)
    }

    fn rename(&self, volume: &Volume, new_name: &str) -> Result<(), MetadataError> {
        debug!(volume = %volume, new_name = %new_name, "renaming volume");
        self.run_streaming(self.invocation(["rename", volume.device_reference.as_str(), new_name]))
    }

    fn delete_snapshot(&self, volume: &Volume, snapshot: &Snapshot) -> Result<(), MetadataError> {
        debug!(volume = %volume, snapshot = %snapshot, "deleting snapshot");
        self.run_streaming(self.invocation([
            "apfs",
            "deletesnapshot",
            volume.device_reference.as_str(),
            "-uuid",
            snapshot.id.as_str(),
        ]))
    }
}
