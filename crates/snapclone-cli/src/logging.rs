//! Tracing subscriber setup.

use std::io;

use snapclone_core::LogFormat;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::prefix::PrefixWriter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber. Events go to stdout indented with a tab,
/// alongside the output of `diskutil` and `asr`.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let writer = || PrefixWriter::tab(io::stdout());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(writer))
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(writer)).init(),
    }
}
