//! Single-entry inspection.
//!
//! `inspect` turns one path into a [`Descriptor`]. A missing path is not an
//! error: it comes back as `None`. Everything else the OS reports is.

use std::fs::{FileType, Metadata};
use std::io;
use std::path::Path;

use fsjet_types::{ChecksumAlgorithm, Descriptor, EntryKind, Times};
use serde::{Deserialize, Serialize};

use crate::checksum::{file_checksum, file_checksum_sync};
use crate::error::{Error, Result};

/// How symbolic links are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymlinkMode {
    /// `lstat`: the link itself is described, with its target.
    #[default]
    Report,
    /// `stat`: the link is resolved and the target is described.
    Follow,
}

/// Which optional descriptor fields to compute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InspectOptions {
    /// Digest file contents with this algorithm.
    pub checksum: Option<ChecksumAlgorithm>,
    /// Report the permission bits (unix).
    pub mode: bool,
    /// Report access/modify/change/birth times.
    pub times: bool,
    /// Report the absolute path.
    pub absolute_path: bool,
    pub symlinks: SymlinkMode,
}

pub(crate) fn kind_of(file_type: FileType) -> EntryKind {
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

/// Final path component, or the empty string for `/` and friends.
pub(crate) fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Inspect `path`, blocking. `Ok(None)` when it does not exist.
pub fn inspect_sync(path: &Path, options: &InspectOptions) -> Result<Option<Descriptor>> {
    let meta = match options.symlinks {
        SymlinkMode::Report => std::fs::symlink_metadata(path),
        SymlinkMode::Follow => std::fs::metadata(path),
    };
    let Some(meta) = absent_as_none(path, meta)? else {
        return Ok(None);
    };

    let mut descriptor = describe(path, &meta, options)?;
    match descriptor.kind {
        EntryKind::File => {
            if let Some(algorithm) = options.checksum {
                descriptor.checksum = Some(file_checksum_sync(path, algorithm)?);
            }
        }
        EntryKind::Symlink => {
            let target = std::fs::read_link(path).map_err(|e| Error::io(path, e))?;
            descriptor.symlink_target = Some(target);
        }
        EntryKind::Dir | EntryKind::Other => {}
    }
    Ok(Some(descriptor))
}

/// Inspect `path`. `Ok(None)` when it does not exist.
pub async fn inspect(path: &Path, options: &InspectOptions) -> Result<Option<Descriptor>> {
    let meta = match options.symlinks {
        SymlinkMode::Report => tokio::fs::symlink_metadata(path).await,
        SymlinkMode::Follow => tokio::fs::metadata(path).await,
    };
    let Some(meta) = absent_as_none(path, meta)? else {
        return Ok(None);
    };

    let mut descriptor = describe(path, &meta, options)?;
    match descriptor.kind {
        EntryKind::File => {
            if let Some(algorithm) = options.checksum {
                descriptor.checksum = Some(file_checksum(path, algorithm).await?);
            }
        }
        EntryKind::Symlink => {
            let target = tokio::fs::read_link(path)
                .await
                .map_err(|e| Error::io(path, e))?;
            descriptor.symlink_target = Some(target);
        }
        EntryKind::Dir | EntryKind::Other => {}
    }
    Ok(Some(descriptor))
}

fn absent_as_none(path: &Path, result: io::Result<Metadata>) -> Result<Option<Metadata>> {
    match result {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// The parts of a descriptor that come straight from metadata.
fn describe(path: &Path, meta: &Metadata, options: &InspectOptions) -> Result<Descriptor> {
    let kind = kind_of(meta.file_type());
    let mut descriptor = Descriptor::new(entry_name(path), kind);

    if kind == EntryKind::File {
        descriptor.size = Some(meta.len());
    }
    if options.mode {
        descriptor.mode = mode_of(meta);
    }
    if options.times {
        descriptor.times = Some(times_of(meta));
    }
    if options.absolute_path {
        let absolute = std::path::absolute(path).map_err(|e| Error::io(path, e))?;
        descriptor.absolute_path = Some(absolute);
    }
    Ok(descriptor)
}

#[cfg(unix)]
pub(crate) fn mode_of(meta: &Metadata) -> Option<u32> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.mode())
}

#[cfg(not(unix))]
pub(crate) fn mode_of(_meta: &Metadata) -> Option<u32> {
    None
}

fn times_of(meta: &Metadata) -> Times {
    Times {
        access: meta.accessed().ok(),
        modify: meta.modified().ok(),
        change: change_time(meta),
        birth: meta.created().ok(),
    }
}

#[cfg(unix)]
fn change_time(meta: &Metadata) -> Option<std::time::SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::{Duration, UNIX_EPOCH};

    let secs = u64::try_from(meta.ctime()).ok()?;
    let nanos = u32::try_from(meta.ctime_nsec()).ok()?;
    UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn change_time(_meta: &Metadata) -> Option<std::time::SystemTime> {
    None
}
