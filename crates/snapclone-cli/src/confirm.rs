//! Interactive confirmation before targets are modified.

use std::io::{BufRead, Write};

use snapclone_core::CloneMode;

use crate::error::{CliError, CliResult};

/// Text shown before asking for confirmation.
pub fn prompt_text(source: &str, targets: &[String], mode: CloneMode) -> String {
    let mut text = match mode {
        CloneMode::Initialize => format!(
            "This will delete all data on the following volumes before restoring them to {}'s most recent snapshot.\n",
            source
        ),
        CloneMode::Incremental => "This will keep existing snapshots but delete any data written to the following volumes after their most recent snapshot.\n".to_string(),
    };
    for target in targets {
        text.push_str(&format!("  - {}\n", target));
    }
    text.push_str("This cannot be undone. Are you sure? y/N: ");
    text
}

/// True if `answer` accepts.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Writes the prompt to `output` and reads one answer line from `input`.
pub fn confirm<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    source: &str,
    targets: &[String],
    mode: CloneMode,
) -> CliResult<()> {
    output.write_all(prompt_text(source, targets, mode).as_bytes())?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    if is_yes(&answer) {
        Ok(())
    } else {
        Err(CliError::ConfirmationRejected)
    }
}
