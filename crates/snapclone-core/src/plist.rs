//! Plist decoding through `plutil`.
//!
//! `plutil -convert json` turns the plist on stdin into JSON on stdout, which
//! is then decoded with serde. Target types therefore use the plist key names
//! as their serde field names.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ExecError, MetadataError};
use crate::exec::{CommandRunner, Invocation};

/// Default `plutil` program.
pub const DEFAULT_PLUTIL: &str = "plutil";

/// Error document some tools print as a plist on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlistErrorMessage {
    /// Set when the document describes an error.
    #[serde(rename = "Error", default)]
    pub is_error: bool,
    /// Human-readable error message.
    #[serde(rename = "ErrorMessage", default)]
    pub message: String,
}

/// Decodes plist-encoded command output.
#[derive(Clone)]
pub struct PlistDecoder {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl PlistDecoder {
    /// Creates a decoder running `plutil` through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_program(runner, DEFAULT_PLUTIL)
    }

    /// Creates a decoder running `program` instead of `plutil`.
    pub fn with_program(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Converts plist data to JSON.
    pub fn to_json(&self, plist: &[u8]) -> Result<Vec<u8>, ExecError> {
        let invocation = Invocation::new(&self.program)
            // Read from stdin, write to stdout.
            .args(["-convert", "json", "-", "-o", "-"])
            .stdin(plist.to_vec());
        Ok(self.runner.run(&invocation)?.stdout)
    }

    /// Decodes `plist`, the output of `command`, into `T`.
    pub fn decode<T: DeserializeOwned>(&self, command: &str, plist: &[u8]) -> Result<T, MetadataError> {
        let json = self.to_json(plist)?;
        serde_json::from_slice(&json).map_err(|source| MetadataError::Decode {
            command: command.to_string(),
            source,
        })
    }

    /// Extracts the error document from a failed command's stdout, if it has
    /// one.
    pub fn error_message(&self, stdout: &[u8]) -> Option<String> {
        if stdout.is_empty() {
            return None;
        }
        let json = self.to_json(stdout).ok()?;
        let doc: PlistErrorMessage = serde_json::from_slice(&json).ok()?;
        doc.is_error.then_some(doc.message)
    }
}

impl std::fmt::Debug for PlistDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlistDecoder")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ScriptedRunner;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Simple {
        val: String,
    }

    #[test]
    fn test_decode_passes_plist_on_stdin() {
        let runner = Arc::new(ScriptedRunner::new().respond("plutil", r#"{"val": "example", "unknown": "foo"}"#));
        let decoder = PlistDecoder::new(runner.clone());
        let got: Simple = decoder.decode("diskutil info", b"<plist/>").unwrap();
        assert_eq!(got, Simple { val: "example".to_string() });

        let calls = runner.calls_to("plutil");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].stdin.as_deref(), Some(&b"<plist/>"[..]));
        assert_eq!(calls[0].args, vec!["-convert", "json", "-", "-o", "-"]);
    }

    #[test]
    fn test_decode_invalid_json() {
        let runner = Arc::new(ScriptedRunner::new().respond("plutil", "not-json"));
        let decoder = PlistDecoder::new(runner);
        let err = decoder.decode::<Simple>("diskutil info", b"").unwrap_err();
        assert!(matches!(err, MetadataError::Decode { .. }));
    }

    #[test]
    fn test_decode_plutil_failure() {
        let runner = Arc::new(ScriptedRunner::new().fail("plutil", "", "bad plist"));
        let decoder = PlistDecoder::new(runner);
        let err = decoder.decode::<Simple>("diskutil info", b"garbage").unwrap_err();
        assert!(matches!(err, MetadataError::Exec(ExecError::Failed { .. })));
    }

    #[test]
    fn test_error_message() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("plutil", r#"{"Error": true, "ErrorMessage": "Could not find disk"}"#),
        );
        let decoder = PlistDecoder::new(runner);
        assert_eq!(
            decoder.error_message(b"<plist/>").as_deref(),
            Some("Could not find disk")
        );
        assert_eq!(decoder.error_message(b""), None);
    }

    #[test]
    fn test_error_message_requires_error_flag() {
        let runner = Arc::new(ScriptedRunner::new().respond("plutil", r#"{"ErrorMessage": "x"}"#));
        let decoder = PlistDecoder::new(runner);
        assert_eq!(decoder.error_message(b"<plist/>"), None);
    }
}
