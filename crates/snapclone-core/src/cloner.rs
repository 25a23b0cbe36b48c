//! Clone orchestration.
//!
//! [`Cloner`] drives one source/target pair through metadata lookup,
//! eligibility checks, restore and the post-restore rename and prune. Each
//! step reads fresh metadata from the provider: a restore can remount the
//! target under a new device reference and rename it.
//!
//! A failure after the restore but before the rename or prune leaves the
//! target restored but misnamed or unpruned. Such a target needs manual
//! inspection; nothing is retried.

use tracing::{info, warn};

use crate::error::{CloneError, CloneResult, MetadataError, RestoreError, Step, ValidationError};
use crate::history::validate_and_reverse;
use crate::provider::{Restorer, VolumeMetadataProvider};
use crate::resolver;
use crate::snapshot::Snapshot;
use crate::validate::{self, CloneMode, VolumeSnapshots};

/// Options shared by every clone a [`Cloner`] performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Incremental or initialize.
    pub mode: CloneMode,
    /// Delete the common snapshot from the target after a successful
    /// incremental clone.
    pub prune: bool,
}

impl CloneOptions {
    /// Options for an incremental clone.
    pub fn incremental(prune: bool) -> Self {
        Self {
            mode: CloneMode::Incremental,
            prune,
        }
    }

    /// Options for initializing empty targets.
    pub fn initialize() -> Self {
        Self {
            mode: CloneMode::Initialize,
            prune: false,
        }
    }

    /// Rejects option combinations that cannot be honored.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prune && self.mode == CloneMode::Initialize {
            return Err(ValidationError::PruneWithInitialize);
        }
        Ok(())
    }
}

/// Result of cloning to one target of a batch.
#[derive(Debug)]
pub struct TargetOutcome {
    /// Target locator as given by the caller.
    pub target: String,
    /// Clone result.
    pub result: CloneResult<()>,
}

/// Per-target results of [`Cloner::clone_all`].
#[derive(Debug)]
pub struct BatchReport {
    /// Source locator.
    pub source: String,
    /// One outcome per target, in the order the targets were given.
    pub outcomes: Vec<TargetOutcome>,
}

impl BatchReport {
    /// Number of targets attempted.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of targets that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// True if every target was cloned.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Failed targets with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &CloneError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.target.as_str(), e)))
    }

    /// Collapses the report into an aggregate error if any target failed.
    pub fn into_result(self) -> CloneResult<()> {
        let failed = self.failed();
        if failed == 0 {
            Ok(())
        } else {
            Err(CloneError::Batch {
                failed,
                total: self.total(),
            })
        }
    }
}

/// Clones the latest snapshot of a source volume onto target volumes.
#[derive(Debug)]
pub struct Cloner<P, R> {
    provider: P,
    restorer: R,
    options: CloneOptions,
}

impl<P: VolumeMetadataProvider, R: Restorer> Cloner<P, R> {
    /// Creates a cloner over the given collaborators.
    pub fn new(provider: P, restorer: R, options: CloneOptions) -> Self {
        Self {
            provider,
            restorer,
            options,
        }
    }

    /// Clone options.
    pub fn options(&self) -> CloneOptions {
        self.options
    }

    /// The metadata provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The restorer.
    pub fn restorer(&self) -> &R {
        &self.restorer
    }

    /// Reads a volume and its validated history.
    fn load(&self, locator: &str) -> CloneResult<VolumeSnapshots> {
        let volume = self
            .provider
            .info(locator)
            .map_err(|e| CloneError::metadata(Step::VolumeInfo, locator, e))?;
        let snapshots = self
            .provider
            .list_snapshots(&volume)
            .map_err(|e| CloneError::metadata(Step::ListSnapshots, locator, e))?;
        let history = validate_and_reverse(snapshots).map_err(|source| {
            CloneError::metadata(
                Step::ListSnapshots,
                locator,
                MetadataError::InvalidHistory {
                    volume: volume.to_string(),
                    source,
                },
            )
        })?;
        Ok(VolumeSnapshots::new(volume, history))
    }

    fn check_options(&self) -> CloneResult<()> {
        self.options
            .validate()
            .map_err(|e| CloneError::validation("invalid options", e))
    }

    /// Checks, without modifying anything, that `source` can be cloned to
    /// every target.
    pub fn cloneable(&self, source: &str, targets: &[String]) -> CloneResult<()> {
        self.check_options()?;
        let source_vs = self.load(source)?;
        let mut target_vss = Vec::with_capacity(targets.len());
        for target in targets {
            target_vss.push((target.clone(), self.load(target)?));
        }
        validate::validate_many(&source_vs, &target_vss, self.options.mode).map_err(|e| {
            CloneError::validation(format!("cannot clone {:?} to {:?}", source, targets), e)
        })
    }

    /// Clones the latest snapshot of `source` onto `target`.
    pub fn clone_volume(&self, source: &str, target: &str) -> CloneResult<()> {
        self.check_options()?;
        info!(source = %source, target = %target, mode = ?self.options.mode, "cloning");

        let source_vs = self.load(source)?;
        let target_vs = self.load(target)?;
        let context = || format!("cannot clone {:?} to {:?}", source, target);
        validate::validate_source(&source_vs, true)
            .and_then(|()| validate::validate_target(&target_vs.volume))
            .and_then(|()| validate::validate_pair(&source_vs, &target_vs, self.options.mode))
            .map_err(|e| CloneError::validation(context(), e))?;

        let latest = source_vs.history.newest().cloned().ok_or_else(|| {
            CloneError::validation(
                context(),
                ValidationError::NoSnapshots {
                    volume: source_vs.volume.name.clone(),
                },
            )
        })?;

        let common = match self.options.mode {
            CloneMode::Incremental => {
                let common = resolver::latest_common(&source_vs.history, &target_vs.history)
                    .map_err(|e| CloneError::validation(context(), e.into()))?;
                info!(snapshot = %common, "found snapshot in common");
                info!(snapshot = %latest, step = %Step::Restore, "restoring to latest snapshot in source from common snapshot");
                self.restorer
                    .restore(&source_vs.volume, &target_vs.volume, &latest, &common)
                    .map_err(|e| self.restore_error(source, target, e))?;
                Some(common)
            }
            CloneMode::Initialize => {
                info!(snapshot = %latest, step = %Step::Restore, "initializing target to latest snapshot in source");
                self.restorer
                    .destructive_restore(&source_vs.volume, &target_vs.volume, &latest)
                    .map_err(|e| self.restore_error(source, target, e))?;
                None
            }
        };

        self.finish(target, &target_vs, common.as_ref())
    }

    fn restore_error(&self, source: &str, target: &str, e: RestoreError) -> CloneError {
        warn!(source = %source, target = %target, error = %e, "restore failed");
        CloneError::Restore {
            source_volume: source.to_string(),
            target: target.to_string(),
            source: e,
        }
    }

    /// Renames the restored target back and prunes `common` if requested.
    fn finish(
        &self,
        target: &str,
        before: &VolumeSnapshots,
        common: Option<&Snapshot>,
    ) -> CloneResult<()> {
        let original_name = before.volume.name.as_str();
        // An incremental restore may remount the target but keeps its id. A
        // destructive restore assigns a new id on the same device.
        let locator = match self.options.mode {
            CloneMode::Incremental => before.volume.id.as_str(),
            CloneMode::Initialize => before.volume.device_reference.as_str(),
        };
        let restored = self
            .provider
            .info(locator)
            .map_err(|e| CloneError::metadata(Step::VolumeInfo, target, e))?;
        info!(target = %target, from = %restored.name, to = %original_name, step = %Step::Rename, "renaming volume to original name");
        self.provider
            .rename(&restored, original_name)
            .map_err(|e| CloneError::metadata(Step::Rename, target, e))?;

        if let (true, Some(common)) = (self.options.prune, common) {
            let renamed = self
                .provider
                .info(locator)
                .map_err(|e| CloneError::metadata(Step::VolumeInfo, target, e))?;
            info!(target = %target, snapshot = %common, step = %Step::DeleteSnapshot, "pruning common snapshot from target");
            self.provider
                .delete_snapshot(&renamed, common)
                .map_err(|e| CloneError::metadata(Step::DeleteSnapshot, target, e))?;
        }
        info!(target = %target, "clone complete");
        Ok(())
    }

    /// Clones `source` onto each target in turn. A failed target does not
    /// stop the remaining ones.
    pub fn clone_all(&self, source: &str, targets: &[String]) -> BatchReport {
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let result = self.clone_volume(source, target);
            if let Err(e) = &result {
                warn!(source = %source, target = %target, error = %e, "clone failed");
            }
            outcomes.push(TargetOutcome {
                target: target.clone(),
                result,
            });
        }
        BatchReport {
            source: source.to_string(),
            outcomes,
        }
    }
}
