//! Volume metadata as reported by the volume metadata provider.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coarse filesystem type of a volume.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilesystemKind {
    /// Copy-on-write filesystem with snapshot support (APFS).
    CopyOnWrite,
    /// Any other filesystem, carrying the provider's type string.
    Other(String),
}

impl FilesystemKind {
    /// Maps a provider `FilesystemType` string (e.g. `apfs`, `hfs`).
    pub fn from_type(fs_type: &str) -> Self {
        if fs_type.eq_ignore_ascii_case("apfs") {
            FilesystemKind::CopyOnWrite
        } else {
            FilesystemKind::Other(fs_type.to_string())
        }
    }

    /// Returns true for copy-on-write filesystems.
    pub fn is_copy_on_write(&self) -> bool {
        matches!(self, FilesystemKind::CopyOnWrite)
    }
}

impl Default for FilesystemKind {
    fn default() -> Self {
        FilesystemKind::Other(String::new())
    }
}

impl fmt::Display for FilesystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilesystemKind::CopyOnWrite => f.write_str("apfs"),
            FilesystemKind::Other(t) => f.write_str(t),
        }
    }
}

impl Serialize for FilesystemKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FilesystemKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(FilesystemKind::from_type(&s))
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.is_empty()))
}

/// A mounted or mountable filesystem volume.
///
/// `id` is stable for the volume's lifetime. `device_reference` and `name`
/// can change whenever the volume is restored or remounted, so a `Volume`
/// must be re-read from the provider after any such operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Stable unique identifier (volume UUID).
    #[serde(rename = "VolumeUUID")]
    pub id: String,
    /// Display name.
    #[serde(rename = "VolumeName", default)]
    pub name: String,
    /// Device node used to address the volume, e.g. `/dev/disk1s2`.
    #[serde(rename = "DeviceNode", default)]
    pub device_reference: String,
    /// Mount point, absent when unmounted.
    #[serde(rename = "MountPoint", default, deserialize_with = "empty_as_none")]
    pub mount_point: Option<String>,
    /// Whether the volume is mounted writable.
    #[serde(rename = "WritableVolume", default)]
    pub writable: bool,
    /// Coarse filesystem type.
    #[serde(rename = "FilesystemType", default)]
    pub filesystem_kind: FilesystemKind,
    /// Fine-grained filesystem name, e.g. `Case-sensitive APFS`.
    #[serde(rename = "FilesystemName", default)]
    pub filesystem_variant: String,
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
