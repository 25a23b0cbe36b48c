//! Batch driver: check, confirm, clone every target, report.

use std::io::{BufRead, Write};

use anyhow::Result;
use snapclone_core::{Cloner, Restorer, VolumeMetadataProvider};
use tracing::info;

use crate::cli::Settings;
use crate::confirm::confirm;

/// Runs a full `snapclone` invocation against `cloner`.
///
/// Nothing is modified unless every target passes the cloneability check
/// and the user confirms (or `assume_yes` is set). Targets are then cloned
/// one after another; failures are written to `errors` and the batch
/// continues. Returns an error if any step or target failed.
pub fn execute<P, R, I, O, E>(
    cloner: &Cloner<P, R>,
    settings: &Settings,
    input: I,
    mut output: O,
    mut errors: E,
) -> Result<()>
where
    P: VolumeMetadataProvider,
    R: Restorer,
    I: BufRead,
    O: Write,
    E: Write,
{
    cloner.cloneable(&settings.source, &settings.targets)?;
    if settings.assume_yes {
        info!("skipping confirmation");
    } else {
        confirm(
            input,
            &mut output,
            &settings.source,
            &settings.targets,
            settings.options.mode,
        )?;
    }

    let report = cloner.clone_all(&settings.source, &settings.targets);
    for (target, err) in report.failures() {
        writeln!(
            errors,
            "failed to clone {:?} to {:?}: {}",
            report.source, target, err
        )?;
    }
    report.into_result()?;
    Ok(())
}
