//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use snapclone_core::{CloneOptions, ClonerConfig, LogFormat, ToolPaths};

use crate::error::{CliError, CliResult};

fn parse_volume(arg: &str) -> Result<String, CliError> {
    if arg.starts_with('-') {
        return Err(CliError::InvalidVolume(arg.to_string()));
    }
    Ok(arg.to_string())
}

/// Clone the latest APFS snapshot of a source volume to target volumes.
#[derive(Debug, Parser)]
#[command(name = "snapclone")]
#[command(
    about = "Clone the latest APFS snapshot of a volume to off-site volumes using snapshot diffs",
    long_about = None
)]
pub struct Cli {
    /// Delete the snapshot source and target had in common once a clone
    /// completes. Incompatible with --initialize.
    #[arg(long, conflicts_with = "initialize")]
    pub prune: bool,

    /// Erase targets and restore them to source's latest snapshot. Use when
    /// first setting up an off-site volume.
    #[arg(long)]
    pub initialize: bool,

    /// Only print what would be changed on targets.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// TOML or JSON config file.
    #[arg(short, long, env = "SNAPCLONE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text or json.
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Source volume: name, mount point, /dev/ path or volume UUID.
    #[arg(value_parser = parse_volume)]
    pub source: String,

    /// Target volumes, in the order they are cloned.
    #[arg(required = true, value_parser = parse_volume)]
    pub targets: Vec<String>,
}

/// Effective settings after merging the config file with the flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Source locator.
    pub source: String,
    /// Target locators.
    pub targets: Vec<String>,
    /// Clone options.
    pub options: CloneOptions,
    /// Build dry-run collaborators.
    pub dry_run: bool,
    /// Skip confirmation.
    pub assume_yes: bool,
    /// Log format.
    pub log_format: LogFormat,
    /// External program paths.
    pub tools: ToolPaths,
}

impl Cli {
    /// Loads the config file, if any, and applies the flags on top.
    pub fn settings(&self) -> CliResult<Settings> {
        let config = match &self.config {
            Some(path) => ClonerConfig::from_file(path)?,
            None => ClonerConfig::default(),
        };
        Ok(self.merge(config))
    }

    fn merge(&self, mut config: ClonerConfig) -> Settings {
        config.prune |= self.prune;
        config.initialize |= self.initialize;
        config.dry_run |= self.dry_run;
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Settings {
            source: self.source.clone(),
            targets: self.targets.clone(),
            options: config.clone_options(),
            dry_run: config.dry_run,
            assume_yes: self.yes,
            log_format: config.log_format,
            tools: config.tools,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapclone_core::CloneMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_source_and_targets() {
        let cli = Cli::parse_from(["snapclone", "/Volumes/Data", "/Volumes/A", "/Volumes/B"]);
        assert_eq!(cli.source, "/Volumes/Data");
        assert_eq!(cli.targets, vec!["/Volumes/A", "/Volumes/B"]);
        assert!(!cli.prune && !cli.initialize && !cli.dry_run && !cli.yes);
    }

    #[test]
    fn test_cli_requires_target() {
        assert!(Cli::try_parse_from(["snapclone", "/Volumes/Data"]).is_err());
    }

    #[test]
    fn test_cli_rejects_dash_volume() {
        assert!(Cli::try_parse_from(["snapclone", "--", "src", "-tgt"]).is_err());
        assert!(Cli::try_parse_from(["snapclone", "--", "-src", "tgt"]).is_err());
    }

    #[test]
    fn test_cli_prune_conflicts_with_initialize() {
        assert!(Cli::try_parse_from(["snapclone", "--prune", "--initialize", "a", "b"]).is_err());
    }

    #[test]
    fn test_cli_log_format() {
        let cli = Cli::parse_from(["snapclone", "--log-format", "json", "a", "b"]);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(Cli::try_parse_from(["snapclone", "--log-format", "xml", "a", "b"]).is_err());
    }

    #[test]
    fn test_settings_flags_override_config() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "log_format = \"json\"\n[tools]\nasr = \"/opt/asr\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from([
            "snapclone",
            "--config",
            path.as_str(),
            "--prune",
            "--log-format",
            "text",
            "a",
            "b",
        ]);
        let settings = cli.settings().unwrap();
        assert_eq!(settings.options, CloneOptions::incremental(true));
        assert_eq!(settings.log_format, LogFormat::Text);
        assert_eq!(settings.tools.asr, "/opt/asr");
    }

    #[test]
    fn test_settings_from_config_only() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(file, r#"{{"initialize": true, "dry_run": true}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from(["snapclone", "-c", path.as_str(), "a", "b"]);
        let settings = cli.settings().unwrap();
        assert_eq!(settings.options.mode, CloneMode::Initialize);
        assert!(settings.dry_run);
        assert!(!settings.assume_yes);
    }

    #[test]
    fn test_settings_missing_config() {
        let cli = Cli::parse_from(["snapclone", "-c", "/nonexistent/snapclone.toml", "a", "b"]);
        assert!(matches!(cli.settings().unwrap_err(), CliError::Config(_)));
    }
}
