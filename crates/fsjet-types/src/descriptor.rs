//! Entry descriptors: the snapshot of one filesystem entry.

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;

/// Kind of filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    /// Sockets, FIFOs, device nodes.
    Other,
}

impl EntryKind {
    /// Lowercase name, as used in serialized descriptors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Dir => "dir",
            Self::Symlink => "symlink",
            Self::Other => "other",
        }
    }
}

/// Timestamps reported by the platform. Any of them may be unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Times {
    pub access: Option<SystemTime>,
    pub modify: Option<SystemTime>,
    /// Inode change time (`ctime`); unix only.
    pub change: Option<SystemTime>,
    pub birth: Option<SystemTime>,
}

/// Immutable snapshot of a filesystem entry at inspection time.
///
/// Optional fields are populated only when the inspection asked for them,
/// which keeps the default inspection down to a single `lstat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Final path component.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Byte size. Set for files; for directories only in inspect-tree
    /// results, where it is the sum of the children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<Times>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
    /// Link target, for symlinks inspected without following.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink_target: Option<PathBuf>,
}

impl Descriptor {
    /// A bare descriptor with only name and kind set.
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            size: None,
            mode: None,
            times: None,
            absolute_path: None,
            checksum: None,
            symlink_target: None,
        }
    }

    /// Create a file descriptor with the given size.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            size: Some(size),
            ..Self::new(name, EntryKind::File)
        }
    }

    /// Create a directory descriptor.
    pub fn dir(name: impl Into<String>) -> Self {
        Self::new(name, EntryKind::Dir)
    }

    /// Create a symlink descriptor pointing at `target`.
    pub fn symlink(name: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            symlink_target: Some(target.into()),
            ..Self::new(name, EntryKind::Symlink)
        }
    }

    /// Returns true if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    /// Returns true if this entry is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Returns true if this entry is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

/// Answer of an existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistsKind {
    Missing,
    File,
    Dir,
    Other,
}

impl ExistsKind {
    /// True for anything but [`ExistsKind::Missing`].
    pub fn exists(self) -> bool {
        self != Self::Missing
    }
}
