#![warn(missing_docs)]

//! `snapclone` binary.

use std::io;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use snapclone_cli::{execute, logging, Cli, PrefixWriter};
use snapclone_core::{CommandRunner, Cloner, DryRunProvider, DryRunRestorer, SystemRunner};

fn main() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        if e.use_stderr() {
            let _ = e.print();
            process::exit(1);
        }
        e.exit()
    });
    let settings = cli.settings()?;
    logging::init(settings.log_format);

    tracing::info!(
        source = %settings.source,
        targets = ?settings.targets,
        dry_run = settings.dry_run,
        "snapclone starting"
    );

    // diskutil and asr output is passed through indented like the log lines.
    let runner: Arc<dyn CommandRunner> =
        Arc::new(SystemRunner::with_stdout_sink(PrefixWriter::tab(io::stdout())));
    let diskutil = settings.tools.diskutil(runner.clone());
    let stdin = io::stdin();

    if settings.dry_run {
        let cloner = Cloner::new(
            DryRunProvider::new(diskutil),
            DryRunRestorer::new(),
            settings.options,
        );
        execute(&cloner, &settings, stdin.lock(), io::stdout(), io::stderr())
    } else {
        let cloner = Cloner::new(diskutil, settings.tools.asr(runner), settings.options);
        execute(&cloner, &settings, stdin.lock(), io::stdout(), io::stderr())
    }
}
