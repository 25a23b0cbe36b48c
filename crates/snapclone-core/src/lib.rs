#![warn(missing_docs)]

//! snapclone core: incremental APFS snapshot cloning
//!
//! Clones the latest snapshot of a source volume onto target volumes using
//! the diff from the most recent snapshot they have in common. This crate
//! holds the snapshot model, history ordering, common-snapshot resolution,
//! cloneability checks and the clone orchestrator, along with the
//! `diskutil`/`asr`/`plutil` collaborators and their dry-run and in-memory
//! counterparts.

pub mod asr;
pub mod cloner;
pub mod config;
pub mod diskutil;
pub mod dryrun;
pub mod error;
pub mod exec;
pub mod history;
pub mod memory;
pub mod plist;
pub mod provider;
pub mod resolver;
pub mod snapshot;
pub mod validate;
pub mod volume;

pub use asr::Asr;
pub use cloner::{BatchReport, CloneOptions, Cloner, TargetOutcome};
pub use config::{ClonerConfig, ConfigError, LogFormat, ToolPaths};
pub use diskutil::DiskUtil;
pub use dryrun::{DryRunProvider, DryRunRestorer};
pub use error::{
    CloneError, CloneResult, ExecError, MetadataError, ResolutionError, RestoreError, Step,
    ValidationError,
};
pub use exec::{CommandOutput, CommandRunner, Invocation, ScriptedRunner, SystemRunner};
pub use history::{validate_and_reverse, SnapshotHistory};
pub use memory::{InMemoryDevices, RestoreCall};
pub use plist::PlistDecoder;
pub use provider::{Restorer, VolumeMetadataProvider};
pub use resolver::{latest_common, latest_common_indices};
pub use snapshot::{parse_time_from_name, Snapshot};
pub use validate::{
    validate_many, validate_pair, validate_source, validate_target, CloneMode, VolumeSnapshots,
};
pub use volume::{FilesystemKind, Volume};
