//! Restorer backed by Apple Software Restore (`asr`).

use std::sync::Arc;

use tracing::info;

use crate::error::RestoreError;
use crate::exec::{CommandRunner, Invocation};
use crate::provider::Restorer;
use crate::snapshot::Snapshot;
use crate::volume::Volume;

/// Default `asr` program.
pub const DEFAULT_ASR: &str = "asr";

/// Restores volumes to APFS snapshots with `asr restore`.
///
/// `asr` output is streamed through the runner's sink while it runs.
#[derive(Clone)]
pub struct Asr {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl Asr {
    /// Creates a restorer running `asr` through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_program(runner, DEFAULT_ASR)
    }

    /// Creates a restorer running `program` instead of `asr`.
    pub fn with_program(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    fn base_args(source: &Volume, target: &Volume, to: &Snapshot) -> Vec<String> {
        vec![
            "restore".to_string(),
            "--source".to_string(),
            source.device_reference.clone(),
            "--target".to_string(),
            target.device_reference.clone(),
            "--toSnapshot".to_string(),
            to.id.clone(),
        ]
    }

    fn run(&self, args: Vec<String>) -> Result<(), RestoreError> {
        let invocation = Invocation::new(&self.program)
            .args(args)
            .args(["--erase", "--noprompt"])
            .streaming();
        info!(command = %invocation, "running asr");
        self.runner.run(&invocation)?;
        Ok(())
    }
}

impl std::fmt::Debug for Asr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asr")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

impl Restorer for Asr {
    fn restore(
        &self,
        source: &Volume,
        target: &Volume,
        to: &Snapshot,
        from: &Snapshot,
    ) -> Result<(), RestoreError> {
        let mut args = Self::base_args(source, target, to);
        args.push("--fromSnapshot".to_string());
        args.push(from.id.clone());
        self.run(args)
    }

    fn destructive_restore(
        &self,
        source: &Volume,
        target: &Volume,
        to: &Snapshot,
    ) -> Result<(), RestoreError> {
        self.run(Self::base_args(source, target, to))
    }
}
