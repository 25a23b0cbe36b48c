//! Point-in-time snapshots of a volume.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// `chrono` format of the timestamp embedded in snapshot names.
pub const NAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}-\d{6}").expect("static regex"))
}

/// Extracts the `YYYY-MM-DD-HHMMSS` timestamp embedded anywhere in a
/// snapshot name, interpreted as UTC.
pub fn parse_time_from_name(name: &str) -> Result<DateTime<Utc>, ValidationError> {
    let matched = timestamp_regex()
        .find(name)
        .ok_or_else(|| ValidationError::MissingTimestamp {
            name: name.to_string(),
        })?
        .as_str();
    NaiveDateTime::parse_from_str(matched, NAME_TIMESTAMP_FORMAT)
        .map(|t| t.and_utc())
        .map_err(|_| ValidationError::MalformedTimestamp {
            name: name.to_string(),
            matched: matched.to_string(),
        })
}

/// An immutable point-in-time capture of a volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Provider-assigned name; usually embeds the creation time.
    #[serde(rename = "SnapshotName")]
    pub name: String,
    /// Unique, stable snapshot id (snapshot UUID).
    #[serde(rename = "SnapshotUUID")]
    pub id: String,
    /// Creation time, when the provider reports it directly.
    #[serde(skip)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Creates a snapshot whose creation time is derived from its name.
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            created_at: None,
        }
    }

    /// Sets an explicit creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Creation time: the provider-supplied value, or else the timestamp
    /// embedded in the name.
    pub fn created(&self) -> Result<DateTime<Utc>, ValidationError> {
        match self.created_at {
            Some(t) => Ok(t),
            None => parse_time_from_name(&self.name),
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
