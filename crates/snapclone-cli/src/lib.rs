#![warn(missing_docs)]

//! snapclone command-line front end: argument parsing, confirmation, indented output, batch driver

pub mod cli;
pub mod confirm;
pub mod error;
pub mod logging;
pub mod prefix;
pub mod run;

pub use cli::{Cli, Settings};
pub use error::{CliError, CliResult};
pub use prefix::PrefixWriter;
pub use run::execute;
