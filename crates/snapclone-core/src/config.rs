//! File-based configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asr::{Asr, DEFAULT_ASR};
use crate::cloner::CloneOptions;
use crate::diskutil::{DiskUtil, DEFAULT_DISKUTIL};
use crate::exec::CommandRunner;
use crate::plist::{PlistDecoder, DEFAULT_PLUTIL};

/// Failure loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("reading config {path:?}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// TOML syntax or schema error.
    #[error("parsing config {path:?}: {source}")]
    Toml {
        /// Config file path.
        path: PathBuf,
        /// Parser error.
        source: toml::de::Error,
    },

    /// JSON syntax or schema error.
    #[error("parsing config {path:?}: {source}")]
    Json {
        /// Config file path.
        path: PathBuf,
        /// Parser error.
        source: serde_json::Error,
    },

    /// Extension is neither `.toml` nor `.json`.
    #[error("Unsupported config file extension: {ext}")]
    UnsupportedExtension {
        /// The extension found.
        ext: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {:?} (expected text or json)", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

/// Paths of the external programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    /// `diskutil` program.
    pub diskutil: String,
    /// `asr` program.
    pub asr: String,
    /// `plutil` program.
    pub plutil: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            diskutil: DEFAULT_DISKUTIL.to_string(),
            asr: DEFAULT_ASR.to_string(),
            plutil: DEFAULT_PLUTIL.to_string(),
        }
    }
}

impl ToolPaths {
    /// Metadata provider running the configured `diskutil` and `plutil`.
    pub fn diskutil(&self, runner: Arc<dyn CommandRunner>) -> DiskUtil {
        let plist = PlistDecoder::with_program(runner.clone(), &self.plutil);
        DiskUtil::with_programs(runner, plist, &self.diskutil)
    }

    /// Restorer running the configured `asr`.
    pub fn asr(&self, runner: Arc<dyn CommandRunner>) -> Asr {
        Asr::with_program(runner, &self.asr)
    }
}

/// Settings for a `snapclone` run. Command-line flags override them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClonerConfig {
    /// Delete the common snapshot from targets after cloning.
    pub prune: bool,
    /// Erase targets and restore source's latest snapshot in full.
    pub initialize: bool,
    /// Only report what would change.
    pub dry_run: bool,
    /// Log output format.
    pub log_format: LogFormat,
    /// External program paths.
    pub tools: ToolPaths,
}

impl ClonerConfig {
    /// Loads a `.toml` or `.json` config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            }),
            "json" => serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            }),
            _ => Err(ConfigError::UnsupportedExtension {
                ext: ext.to_string(),
            }),
        }
    }

    /// Clone options described by this config.
    pub fn clone_options(&self) -> CloneOptions {
        if self.initialize {
            CloneOptions {
                mode: crate::validate::CloneMode::Initialize,
                prune: self.prune,
            }
        } else {
            CloneOptions::incremental(self.prune)
        }
    }
}
