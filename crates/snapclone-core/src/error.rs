//! Error types for snapshot cloning.
//!
//! [`ValidationError`] covers every precondition checked before a volume is
//! mutated, [`MetadataError`] and [`RestoreError`] come from the two external
//! collaborators, and [`CloneError`] wraps all of them with the orchestrator
//! step and volume they belong to.

use std::fmt;

use thiserror::Error;

/// Result type alias for orchestrator operations.
pub type CloneResult<T> = Result<T, CloneError>;

/// Orchestrator step an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Reading volume metadata.
    VolumeInfo,
    /// Listing a volume's snapshots.
    ListSnapshots,
    /// Running the restore primitive.
    Restore,
    /// Renaming the target back to its original name.
    Rename,
    /// Pruning the common snapshot from the target.
    DeleteSnapshot,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::VolumeInfo => "getting volume info",
            Step::ListSnapshots => "listing snapshots",
            Step::Restore => "restoring",
            Step::Rename => "renaming volume to original name",
            Step::DeleteSnapshot => "deleting common snapshot",
        };
        f.write_str(s)
    }
}

/// Outcome of common-snapshot resolution that rules out an incremental clone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Source and target histories share no snapshot id.
    #[error("no snapshot in common")]
    NoCommonSnapshot,

    /// The common snapshot is the latest snapshot of both volumes.
    #[error("both source and target have the same latest snapshot {snapshot}")]
    AlreadyInSync {
        /// Display form of the shared latest snapshot.
        snapshot: String,
    },

    /// The common snapshot is source's latest but target has newer ones.
    #[error("target has a snapshot ahead of source (common snapshot {snapshot} is source's latest)")]
    TargetAheadOfSource {
        /// Display form of the common snapshot.
        snapshot: String,
    },
}

/// A precondition violated before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Volume is not a copy-on-write (APFS) volume.
    #[error("{volume} is not an APFS volume (filesystem type {kind:?})")]
    NotCopyOnWrite {
        /// Volume display name.
        volume: String,
        /// Filesystem type reported by the provider.
        kind: String,
    },

    /// Target volume is mounted read-only.
    #[error("{volume} is not writable")]
    NotWritable {
        /// Volume display name.
        volume: String,
    },

    /// Source volume has no snapshots to clone.
    #[error("{volume} has no snapshots")]
    NoSnapshots {
        /// Volume display name.
        volume: String,
    },

    /// Initialize requested on a target that still has snapshots.
    #[error("{volume} has {snapshots} snapshot(s); erase it before initializing")]
    TargetNotEmpty {
        /// Volume display name.
        volume: String,
        /// Number of snapshots present on the target.
        snapshots: usize,
    },

    /// Source and target are the same volume.
    #[error("source and target are the same volume ({id})")]
    SameVolume {
        /// Shared volume id.
        id: String,
    },

    /// The same target volume was supplied more than once.
    #[error("target {second:?} is the same volume as target {first:?} ({id})")]
    DuplicateTarget {
        /// Shared volume id.
        id: String,
        /// Locator of the first occurrence.
        first: String,
        /// Locator of the repeated occurrence.
        second: String,
    },

    /// Source and target filesystem variants differ.
    #[error("filesystem of source ({source_variant:?}) differs from target ({target_variant:?})")]
    VariantMismatch {
        /// Source filesystem variant.
        source_variant: String,
        /// Target filesystem variant.
        target_variant: String,
    },

    /// Snapshot name carries no timestamp.
    #[error("snapshot name ({name:?}) does not contain a timestamp of the form yyyy-mm-dd-hhmmss")]
    MissingTimestamp {
        /// Snapshot name.
        name: String,
    },

    /// Snapshot name carries a timestamp that is not a valid date/time.
    #[error("failed to parse time substring ({matched:?}) from snapshot name {name:?}")]
    MalformedTimestamp {
        /// Snapshot name.
        name: String,
        /// The matched timestamp substring.
        matched: String,
    },

    /// Provider returned snapshots that are not ordered oldest-first.
    #[error("snapshots returned in an unexpected order: {snapshot} listed after newer {previous}")]
    OutOfOrder {
        /// Snapshot found out of place.
        snapshot: String,
        /// The newer snapshot listed before it.
        previous: String,
    },

    /// The same snapshot id appears twice in one history.
    #[error("snapshot id {id} listed more than once")]
    DuplicateSnapshot {
        /// Repeated snapshot id.
        id: String,
    },

    /// Prune was requested together with initialize.
    #[error("prune and initialize are incompatible")]
    PruneWithInitialize,

    /// Common-snapshot resolution rules out an incremental clone.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Failure running an external command.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The command could not be started.
    #[error("`{command}` could not be started: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The command exited unsuccessfully.
    #[error("`{command}` failed ({status}) with stderr: {stderr}")]
    Failed {
        /// Rendered command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured stdout.
        stdout: Vec<u8>,
        /// Captured stderr.
        stderr: String,
    },

    /// Writing stdin or forwarding stdout failed.
    #[error("`{command}` I/O error: {source}")]
    Io {
        /// Rendered command line.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A scripted runner has no response for the program.
    #[error("no scripted response for `{command}`")]
    Unscripted {
        /// Rendered command line.
        command: String,
    },
}

/// Failure reported by a volume metadata provider.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The provider command failed.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The provider command failed and reported an error document.
    #[error("`{command}` failed with error: {message}")]
    Tool {
        /// Rendered command line.
        command: String,
        /// Message from the tool's plist error document.
        message: String,
        /// The failed command.
        #[source]
        cause: ExecError,
    },

    /// Provider output could not be decoded.
    #[error("error parsing output of `{command}`: {source}")]
    Decode {
        /// Rendered command line.
        command: String,
        /// JSON decode error.
        source: serde_json::Error,
    },

    /// No volume matches the locator.
    #[error("volume {locator:?} does not exist")]
    VolumeNotFound {
        /// Locator that failed to resolve.
        locator: String,
    },

    /// The snapshot does not exist on the volume.
    #[error("snapshot {snapshot} not found on {volume}")]
    SnapshotNotFound {
        /// Volume display name.
        volume: String,
        /// Snapshot display form.
        snapshot: String,
    },

    /// The listed snapshots do not form a valid history.
    #[error("invalid snapshot list for {volume}: {source}")]
    InvalidHistory {
        /// Volume display name.
        volume: String,
        /// The violated history invariant.
        source: ValidationError,
    },
}

/// Failure reported by a restorer.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// The restore command failed.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The restorer refused the requested restore.
    #[error("restore rejected: {reason}")]
    Rejected {
        /// Why the restore was refused.
        reason: String,
    },
}

/// Errors surfaced by the clone orchestrator.
#[derive(Debug, Error)]
pub enum CloneError {
    /// A precondition does not hold; nothing was modified.
    #[error("{context}: {source}")]
    Validation {
        /// What was being validated.
        context: String,
        /// The violated precondition.
        source: ValidationError,
    },

    /// The metadata provider failed.
    #[error("error {step} of {volume:?}: {source}")]
    Metadata {
        /// Step that failed.
        step: Step,
        /// Locator or name of the volume involved.
        volume: String,
        /// Provider error.
        source: MetadataError,
    },

    /// The restore primitive failed; target may need manual inspection.
    #[error("error restoring {target:?} from {source_volume:?}: {source}")]
    Restore {
        /// Source volume locator.
        source_volume: String,
        /// Target volume locator.
        target: String,
        /// Restorer error.
        source: RestoreError,
    },

    /// One or more targets of a batch failed.
    #[error("failed to clone to {failed}/{total} targets")]
    Batch {
        /// Number of failed targets.
        failed: usize,
        /// Number of targets attempted.
        total: usize,
    },
}

impl CloneError {
    /// Wraps a validation failure with context.
    pub fn validation(context: impl Into<String>, source: ValidationError) -> Self {
        CloneError::Validation {
            context: context.into(),
            source,
        }
    }

    /// Wraps a provider failure with the step and volume it occurred on.
    pub fn metadata(step: Step, volume: impl Into<String>, source: MetadataError) -> Self {
        CloneError::Metadata {
            step,
            volume: volume.into(),
            source,
        }
    }

    /// Returns the validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            CloneError::Validation { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns the resolution error, if validation failed on resolution.
    pub fn as_resolution(&self) -> Option<&ResolutionError> {
        match self.as_validation() {
            Some(ValidationError::Resolution(e)) => Some(e),
            _ => None,
        }
    }
}
