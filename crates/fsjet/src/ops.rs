//! Plain file and directory operations: existence checks, listing, mkdir -p,
//! reads, writes (optionally atomic), removal and moves.
//!
//! Every operation has a blocking `_sync` form and an async form over
//! `tokio::fs` with the same behavior.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use fsjet_types::ExistsKind;
use futures::future::BoxFuture;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Options for [`ensure_dir`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DirOptions {
    /// Delete everything inside the directory if it already exists.
    pub empty: bool,
    /// Permission bits to apply (unix).
    pub mode: Option<u32>,
}

/// Options for [`write`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Write to a sibling temp file, then rename it over the target.
    pub atomic: bool,
    /// Permission bits to apply (unix).
    pub mode: Option<u32>,
}

/// Options for [`move_to`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MoveOptions {
    /// Replace whatever is at the destination.
    pub overwrite: bool,
}

fn is_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

fn exists_kind(meta: &std::fs::Metadata) -> ExistsKind {
    if meta.is_dir() {
        ExistsKind::Dir
    } else if meta.is_file() {
        ExistsKind::File
    } else {
        ExistsKind::Other
    }
}

/// Temp file used by atomic writes: `<path>.__new__`.
fn atomic_temp_path(path: &Path) -> PathBuf {
    let mut temp = OsString::from(path.as_os_str());
    temp.push(".__new__");
    PathBuf::from(temp)
}

#[cfg(unix)]
pub(crate) fn set_mode_sync(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
        .map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
pub(crate) fn set_mode_sync(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
pub(crate) async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
        .await
        .map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
pub(crate) async fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// exists / list
// ---------------------------------------------------------------------------

/// What is at `path`, following symlinks.
pub fn exists_sync(path: &Path) -> Result<ExistsKind> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(exists_kind(&meta)),
        Err(e) if is_absent(&e) => Ok(ExistsKind::Missing),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// What is at `path`, following symlinks.
pub async fn exists(path: &Path) -> Result<ExistsKind> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(exists_kind(&meta)),
        Err(e) if is_absent(&e) => Ok(ExistsKind::Missing),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Names in the directory at `path`, sorted. `None` when it does not exist.
pub fn list_sync(path: &Path) -> Result<Option<Vec<String>>> {
    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(path, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(Some(names))
}

/// Names in the directory at `path`, sorted. `None` when it does not exist.
pub async fn list(path: &Path) -> Result<Option<Vec<String>>> {
    let mut entries = match tokio::fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(path, e))? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(Some(names))
}

// ---------------------------------------------------------------------------
// ensure_dir
// ---------------------------------------------------------------------------

/// Make sure a directory exists at `path`, creating missing parents.
///
/// Concurrent creation of the same directory is not an error. Fails with
/// NotADirectory when something other than a directory is in the way.
pub fn ensure_dir_sync(path: &Path, options: &DirOptions) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {
            if options.empty {
                for name in list_sync(path)?.unwrap_or_default() {
                    remove_sync(&path.join(name))?;
                }
            }
        }
        Ok(_) => {
            return Err(Error::not_a_directory(
                path,
                "Path exists but is not a directory",
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            std::fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
        }
        Err(e) => return Err(Error::io(path, e)),
    }
    if let Some(mode) = options.mode {
        set_mode_sync(path, mode)?;
    }
    Ok(())
}

/// Make sure a directory exists at `path`, creating missing parents.
pub async fn ensure_dir(path: &Path, options: &DirOptions) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => {
            if options.empty {
                for name in list(path).await?.unwrap_or_default() {
                    remove(&path.join(name)).await?;
                }
            }
        }
        Ok(_) => {
            return Err(Error::not_a_directory(
                path,
                "Path exists but is not a directory",
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|e| Error::io(path, e))?;
        }
        Err(e) => return Err(Error::io(path, e)),
    }
    if let Some(mode) = options.mode {
        set_mode(path, mode).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// read / write
// ---------------------------------------------------------------------------

/// File contents, or `None` when there is no file.
pub fn read_sync(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// File contents, or `None` when there is no file.
pub async fn read(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// File contents as UTF-8, or `None` when there is no file.
pub fn read_to_string_sync(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// File contents as UTF-8, or `None` when there is no file.
pub async fn read_to_string(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn write_creating_parents_sync(path: &Path, data: &[u8]) -> Result<()> {
    match std::fs::write(path, data) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                ensure_dir_sync(parent, &DirOptions::default())?;
            }
            std::fs::write(path, data).map_err(|e| Error::io(path, e))
        }
        other => other.map_err(|e| Error::io(path, e)),
    }
}

async fn write_creating_parents(path: &Path, data: &[u8]) -> Result<()> {
    match tokio::fs::write(path, data).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                ensure_dir(parent, &DirOptions::default()).await?;
            }
            tokio::fs::write(path, data)
                .await
                .map_err(|e| Error::io(path, e))
        }
        other => other.map_err(|e| Error::io(path, e)),
    }
}

/// Write `data` to `path`, replacing any previous contents and creating
/// missing parent directories.
pub fn write_sync(path: &Path, data: impl AsRef<[u8]>, options: &WriteOptions) -> Result<()> {
    let target = if options.atomic {
        atomic_temp_path(path)
    } else {
        path.to_path_buf()
    };
    write_creating_parents_sync(&target, data.as_ref())?;
    if let Some(mode) = options.mode {
        set_mode_sync(&target, mode)?;
    }
    if options.atomic {
        std::fs::rename(&target, path).map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

/// Write `data` to `path`, replacing any previous contents and creating
/// missing parent directories.
pub async fn write(path: &Path, data: impl AsRef<[u8]>, options: &WriteOptions) -> Result<()> {
    let target = if options.atomic {
        atomic_temp_path(path)
    } else {
        path.to_path_buf()
    };
    write_creating_parents(&target, data.as_ref()).await?;
    if let Some(mode) = options.mode {
        set_mode(&target, mode).await?;
    }
    if options.atomic {
        tokio::fs::rename(&target, path)
            .await
            .map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// remove
// ---------------------------------------------------------------------------

/// Remove whatever is at `path`. Directories are emptied child by child
/// first; the first failure stops the removal. A missing path is fine.
pub fn remove_sync(path: &Path) -> Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(path, e)),
    };
    if meta.is_dir() {
        let entries = std::fs::read_dir(path).map_err(|e| Error::io(path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(path, e))?;
            remove_sync(&entry.path())?;
        }
        std::fs::remove_dir(path).map_err(|e| Error::io(path, e))
    } else {
        std::fs::remove_file(path).map_err(|e| Error::io(path, e))
    }
}

/// Remove whatever is at `path`. Directories are emptied child by child
/// first; the first failure stops the removal. A missing path is fine.
pub fn remove(path: &Path) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let meta = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::io(path, e)),
        };
        if meta.is_dir() {
            let mut entries = tokio::fs::read_dir(path)
                .await
                .map_err(|e| Error::io(path, e))?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(path, e))? {
                remove(&entry.path()).await?;
            }
            tokio::fs::remove_dir(path)
                .await
                .map_err(|e| Error::io(path, e))
        } else {
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| Error::io(path, e))
        }
    })
}

// ---------------------------------------------------------------------------
// move
// ---------------------------------------------------------------------------

/// Rename `from` to `to`, creating missing destination parents.
pub fn move_sync(from: &Path, to: &Path, options: &MoveOptions) -> Result<()> {
    if !exists_sync(from)?.exists() {
        return Err(Error::not_found(from, "Path to move doesn't exist"));
    }
    if exists_sync(to)?.exists() {
        if !options.overwrite {
            return Err(Error::already_exists(to, "Destination path already exists"));
        }
        remove_sync(to)?;
    }
    match std::fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = to.parent() {
                ensure_dir_sync(parent, &DirOptions::default())?;
            }
            std::fs::rename(from, to).map_err(|e| Error::io(to, e))
        }
        other => other.map_err(|e| Error::io(to, e)),
    }
}

/// Rename `from` to `to`, creating missing destination parents.
pub async fn move_to(from: &Path, to: &Path, options: &MoveOptions) -> Result<()> {
    if !exists(from).await?.exists() {
        return Err(Error::not_found(from, "Path to move doesn't exist"));
    }
    if exists(to).await?.exists() {
        if !options.overwrite {
            return Err(Error::already_exists(to, "Destination path already exists"));
        }
        remove(to).await?;
    }
    match tokio::fs::rename(from, to).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = to.parent() {
                ensure_dir(parent, &DirOptions::default()).await?;
            }
            tokio::fs::rename(from, to)
                .await
                .map_err(|e| Error::io(to, e))
        }
        other => other.map_err(|e| Error::io(to, e)),
    }
}
