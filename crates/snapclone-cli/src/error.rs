//! CLI error types.

use thiserror::Error;

/// Errors raised by the command-line front end.
#[derive(Debug, Error)]
pub enum CliError {
    /// A volume argument looks like a flag.
    #[error("{0:?} is not a valid volume")]
    InvalidVolume(String),

    /// The user did not confirm.
    #[error("confirmation rejected")]
    ConfirmationRejected,

    /// Reading the confirmation or writing the prompt failed.
    #[error("confirmation I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file could not be loaded.
    #[error(transparent)]
    Config(#[from] snapclone_core::ConfigError),
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
