//! Copy a file or a whole tree, optionally filtered by patterns.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fsjet_glob::{MatchOptions, PatternSet};
use fsjet_types::{Descriptor, EntryKind};
use futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::inspect::{InspectOptions, SymlinkMode, inspect, inspect_sync};
use crate::ops::{self, DirOptions};
use crate::walk::{WalkEntry, WalkOptions, WalkStream, walk_sync};

/// Upper bound on entries copied at once by [`copy`].
const MAX_IN_FLIGHT: usize = 32;

/// Callback deciding whether an existing destination file is replaced.
/// Receives the source and the destination descriptors.
pub type DecideFn = Arc<dyn Fn(&Descriptor, &Descriptor) -> bool + Send + Sync>;

/// What to do when the destination already exists.
#[derive(Clone, Default)]
pub enum Overwrite {
    /// Fail with AlreadyExists before copying anything.
    #[default]
    Never,
    /// Replace existing files.
    Always,
    /// Ask per existing file; `false` leaves it untouched.
    Decide(DecideFn),
}

impl fmt::Debug for Overwrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overwrite::Never => f.write_str("Never"),
            Overwrite::Always => f.write_str("Always"),
            Overwrite::Decide(_) => f.write_str("Decide(..)"),
        }
    }
}

impl From<bool> for Overwrite {
    fn from(overwrite: bool) -> Self {
        if overwrite {
            Overwrite::Always
        } else {
            Overwrite::Never
        }
    }
}

/// Options for [`copy`].
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    pub overwrite: Overwrite,
    /// Only copy entries matching these patterns, anchored at the source.
    /// Everything is copied when unset.
    pub matching: Option<Vec<String>>,
    pub ignore_case: bool,
}

impl CopyOptions {
    fn matcher(&self, from: &Path) -> Result<Option<PatternSet>> {
        let Some(patterns) = &self.matching else {
            return Ok(None);
        };
        let options = MatchOptions {
            ignore_case: self.ignore_case,
        };
        Ok(Some(PatternSet::with_options(from, patterns, options)?))
    }
}

fn walk_options() -> WalkOptions {
    WalkOptions {
        max_depth: None,
        inspect: InspectOptions {
            mode: true,
            symlinks: SymlinkMode::Report,
            ..Default::default()
        },
    }
}

/// A walked source entry together with where it goes.
struct Planned {
    source: PathBuf,
    dest: PathBuf,
    descriptor: Descriptor,
}

/// Everything a copy needs besides the entries themselves.
struct Plan<'a> {
    from: &'a Path,
    to: &'a Path,
    matcher: Option<PatternSet>,
    overwrite: &'a Overwrite,
}

impl Plan<'_> {
    /// Map a walk entry to its destination, or `None` if it is skipped.
    fn route(&self, entry: WalkEntry) -> Option<Planned> {
        let descriptor = entry.descriptor?;
        if let Some(matcher) = &self.matcher
            && !matcher.is_match(&entry.path)
        {
            return None;
        }
        let dest = match entry.path.strip_prefix(self.from) {
            Ok(rel) if rel.as_os_str().is_empty() => self.to.to_path_buf(),
            Ok(rel) => self.to.join(rel),
            Err(_) => self.to.join(crate::paths::relative(self.from, &entry.path)),
        };
        Some(Planned {
            source: entry.path,
            dest,
            descriptor,
        })
    }
}

fn source_missing(from: &Path) -> Error {
    Error::not_found(from, "Path to copy doesn't exist")
}

fn destination_exists(to: &Path) -> Error {
    Error::already_exists(to, "Destination path already exists")
}

// ---------------------------------------------------------------------------
// blocking
// ---------------------------------------------------------------------------

/// Copy `from` to `to`, blocking.
///
/// Not transactional: on failure, entries copied so far stay in place.
#[tracing::instrument(level = "debug", skip(options))]
pub fn copy_sync(from: &Path, to: &Path, options: &CopyOptions) -> Result<()> {
    let matcher = options.matcher(from)?;
    if !ops::exists_sync(from)?.exists() {
        return Err(source_missing(from));
    }
    if matches!(options.overwrite, Overwrite::Never) && ops::exists_sync(to)?.exists() {
        return Err(destination_exists(to));
    }

    let plan = Plan {
        from,
        to,
        matcher,
        overwrite: &options.overwrite,
    };
    walk_sync(from, &walk_options(), |entry| {
        match plan.route(entry.clone()) {
            Some(item) => copy_item_sync(&item, plan.overwrite),
            None => Ok(()),
        }
    })
}

fn copy_item_sync(item: &Planned, overwrite: &Overwrite) -> Result<()> {
    tracing::trace!(source = %item.source.display(), dest = %item.dest.display(), kind = item.descriptor.kind.as_str(), "copy");
    match item.descriptor.kind {
        EntryKind::Dir => ops::ensure_dir_sync(
            &item.dest,
            &DirOptions {
                empty: false,
                mode: item.descriptor.mode,
            },
        ),
        EntryKind::File => copy_file_sync(item, overwrite),
        EntryKind::Symlink => copy_symlink_sync(item),
        EntryKind::Other => Ok(()),
    }
}

fn copy_file_sync(item: &Planned, overwrite: &Overwrite) -> Result<()> {
    if let Overwrite::Decide(decide) = overwrite
        && let Some(existing) = inspect_sync(&item.dest, &InspectOptions { mode: true, ..Default::default() })?
        && !decide(&item.descriptor, &existing)
    {
        return Ok(());
    }
    let create_new = matches!(overwrite, Overwrite::Never);

    let mut source = std::fs::File::open(&item.source).map_err(|e| Error::io(&item.source, e))?;
    let mut dest = match open_dest_sync(&item.dest, create_new) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = item.dest.parent() {
                ops::ensure_dir_sync(parent, &DirOptions::default())?;
            }
            open_dest_sync(&item.dest, create_new)
        }
        other => other,
    }
    .map_err(|e| dest_error(&item.dest, e))?;

    io::copy(&mut source, &mut dest).map_err(|e| Error::io(&item.dest, e))?;
    if let Some(mode) = item.descriptor.mode {
        ops::set_mode_sync(&item.dest, mode)?;
    }
    Ok(())
}

fn open_dest_sync(path: &Path, create_new: bool) -> io::Result<std::fs::File> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    options.open(path)
}

fn dest_error(dest: &Path, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::AlreadyExists {
        destination_exists(dest)
    } else {
        Error::io(dest, err)
    }
}

fn copy_symlink_sync(item: &Planned) -> Result<()> {
    let target = match &item.descriptor.symlink_target {
        Some(target) => target.clone(),
        None => std::fs::read_link(&item.source).map_err(|e| Error::io(&item.source, e))?,
    };
    match symlink_sync(&target, &item.dest) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(dest = %item.dest.display(), "replacing existing entry with symlink");
            std::fs::remove_file(&item.dest).map_err(|e| Error::io(&item.dest, e))?;
            symlink_sync(&target, &item.dest)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = item.dest.parent() {
                ops::ensure_dir_sync(parent, &DirOptions::default())?;
            }
            symlink_sync(&target, &item.dest)
        }
        other => other,
    }
    .map_err(|e| Error::io(&item.dest, e))
}

#[cfg(unix)]
fn symlink_sync(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_sync(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

// ---------------------------------------------------------------------------
// async
// ---------------------------------------------------------------------------

/// Copy `from` to `to`.
///
/// Entries are copied concurrently as the walk produces them. The copy
/// resolves once the walk is exhausted and every started entry has finished;
/// the first failure from either fails the whole copy.
#[tracing::instrument(level = "debug", skip(options))]
pub async fn copy(from: &Path, to: &Path, options: &CopyOptions) -> Result<()> {
    let matcher = options.matcher(from)?;
    if !ops::exists(from).await?.exists() {
        return Err(source_missing(from));
    }
    if matches!(options.overwrite, Overwrite::Never) && ops::exists(to).await?.exists() {
        return Err(destination_exists(to));
    }

    let plan = Plan {
        from,
        to,
        matcher,
        overwrite: &options.overwrite,
    };
    let plan = &plan;
    WalkStream::new(from, &walk_options())
        .into_stream()
        .try_filter_map(|entry| futures::future::ready(Ok(plan.route(entry))))
        .try_for_each_concurrent(MAX_IN_FLIGHT, |item| async move {
            copy_item(&item, plan.overwrite).await
        })
        .await
}

async fn copy_item(item: &Planned, overwrite: &Overwrite) -> Result<()> {
    tracing::trace!(source = %item.source.display(), dest = %item.dest.display(), kind = item.descriptor.kind.as_str(), "copy");
    match item.descriptor.kind {
        EntryKind::Dir => {
            ops::ensure_dir(
                &item.dest,
                &DirOptions {
                    empty: false,
                    mode: item.descriptor.mode,
                },
            )
            .await
        }
        EntryKind::File => copy_file(item, overwrite).await,
        EntryKind::Symlink => copy_symlink(item).await,
        EntryKind::Other => Ok(()),
    }
}

async fn copy_file(item: &Planned, overwrite: &Overwrite) -> Result<()> {
    if let Overwrite::Decide(decide) = overwrite
        && let Some(existing) = inspect(&item.dest, &InspectOptions { mode: true, ..Default::default() }).await?
        && !decide(&item.descriptor, &existing)
    {
        return Ok(());
    }
    let create_new = matches!(overwrite, Overwrite::Never);

    let mut source = tokio::fs::File::open(&item.source)
        .await
        .map_err(|e| Error::io(&item.source, e))?;
    let mut dest = match open_dest(&item.dest, create_new).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = item.dest.parent() {
                ops::ensure_dir(parent, &DirOptions::default()).await?;
            }
            open_dest(&item.dest, create_new).await
        }
        other => other,
    }
    .map_err(|e| dest_error(&item.dest, e))?;

    tokio::io::copy(&mut source, &mut dest)
        .await
        .map_err(|e| Error::io(&item.dest, e))?;
    if let Some(mode) = item.descriptor.mode {
        ops::set_mode(&item.dest, mode).await?;
    }
    Ok(())
}

async fn open_dest(path: &Path, create_new: bool) -> io::Result<tokio::fs::File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    options.open(path).await
}

async fn copy_symlink(item: &Planned) -> Result<()> {
    let target = match &item.descriptor.symlink_target {
        Some(target) => target.clone(),
        None => tokio::fs::read_link(&item.source)
            .await
            .map_err(|e| Error::io(&item.source, e))?,
    };
    match symlink(&target, &item.dest).await {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(dest = %item.dest.display(), "replacing existing entry with symlink");
            tokio::fs::remove_file(&item.dest)
                .await
                .map_err(|e| Error::io(&item.dest, e))?;
            symlink(&target, &item.dest).await
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = item.dest.parent() {
                ops::ensure_dir(parent, &DirOptions::default()).await?;
            }
            symlink(&target, &item.dest).await
        }
        other => other,
    }
    .map_err(|e| Error::io(&item.dest, e))
}

#[cfg(unix)]
async fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(windows)]
async fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    tokio::fs::symlink_file(target, link).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::create_dir_all(src.join("empty")).unwrap();
        fs::write(src.join("top.txt"), b"top").unwrap();
        fs::write(src.join("a/one.md"), b"one").unwrap();
        fs::write(src.join("a/b/two.txt"), b"two").unwrap();
        dir
    }

    #[test]
    fn copies_whole_tree() {
        let dir = fixture();
        let to = dir.path().join("dst");
        copy_sync(&dir.path().join("src"), &to, &CopyOptions::default()).unwrap();

        assert_eq!(fs::read(to.join("top.txt")).unwrap(), b"top");
        assert_eq!(fs::read(to.join("a/b/two.txt")).unwrap(), b"two");
        assert!(to.join("empty").is_dir());
    }

    #[test]
    fn copies_single_file() {
        let dir = fixture();
        let to = dir.path().join("copy.txt");
        copy_sync(&dir.path().join("src/top.txt"), &to, &CopyOptions::default()).unwrap();
        assert_eq!(fs::read(&to).unwrap(), b"top");
    }

    #[test]
    fn missing_source() {
        let dir = fixture();
        let err = copy_sync(
            &dir.path().join("nope"),
            &dir.path().join("dst"),
            &CopyOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("Path to copy doesn't exist"));
    }

    #[test]
    fn matching_filters_and_creates_parents() {
        let dir = fixture();
        let to = dir.path().join("dst");
        let options = CopyOptions {
            matching: Some(vec!["*.txt".into()]),
            ..Default::default()
        };
        copy_sync(&dir.path().join("src"), &to, &options).unwrap();

        assert!(to.join("top.txt").is_file());
        assert!(to.join("a/b/two.txt").is_file());
        assert!(!to.join("a/one.md").exists());
        assert!(!to.join("empty").exists());
    }

    #[test]
    fn decide_callback_per_file() {
        let dir = fixture();
        let to = dir.path().join("dst");
        fs::create_dir_all(to.join("a/b")).unwrap();
        fs::write(to.join("top.txt"), b"keep me").unwrap();
        fs::write(to.join("a/b/two.txt"), b"replace me").unwrap();

        let options = CopyOptions {
            overwrite: Overwrite::Decide(Arc::new(|src: &Descriptor, _dest: &Descriptor| {
                src.name != "top.txt"
            })),
            ..Default::default()
        };
        copy_sync(&dir.path().join("src"), &to, &options).unwrap();

        assert_eq!(fs::read(to.join("top.txt")).unwrap(), b"keep me");
        assert_eq!(fs::read(to.join("a/b/two.txt")).unwrap(), b"two");
        assert_eq!(fs::read(to.join("a/one.md")).unwrap(), b"one");
    }

    #[cfg(unix)]
    #[test]
    fn preserves_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = fixture();
        let script = dir.path().join("src/run.sh");
        fs::write(&script, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();

        let to = dir.path().join("dst");
        copy_sync(&dir.path().join("src"), &to, &CopyOptions::default()).unwrap();
        let mode = fs::metadata(to.join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_recreated_and_replaced() {
        let dir = fixture();
        let src = dir.path().join("src");
        std::os::unix::fs::symlink("top.txt", src.join("link")).unwrap();

        let to = dir.path().join("dst");
        fs::create_dir_all(&to).unwrap();
        std::os::unix::fs::symlink("elsewhere", to.join("link")).unwrap();

        copy(&src, &to, &CopyOptions { overwrite: Overwrite::Always, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(fs::read_link(to.join("link")).unwrap(), Path::new("top.txt"));
        assert_eq!(fs::read(to.join("link")).unwrap(), b"top");
    }

    #[tokio::test]
    async fn async_copy_matches_sync() {
        let dir = fixture();
        let src = dir.path().join("src");
        copy_sync(&src, &dir.path().join("sync"), &CopyOptions::default()).unwrap();
        copy(&src, &dir.path().join("async"), &CopyOptions::default())
            .await
            .unwrap();

        let files_under = |root: PathBuf| {
            let mut found = crate::find_sync(&root, &Default::default(), &root).unwrap();
            found.sort();
            found
        };
        assert_eq!(files_under(dir.path().join("sync")), files_under(dir.path().join("async")));
        assert_eq!(fs::read(dir.path().join("async/a/b/two.txt")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn async_failure_in_flight_fails_the_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        for i in 0..50 {
            fs::create_dir_all(src.join(format!("d{i}"))).unwrap();
            fs::write(src.join(format!("d{i}/f.txt")), b"x").unwrap();
        }
        // The last file cannot be written: a directory sits at its destination.
        let to = dir.path().join("dst");
        let blocked = to.join("d49/f.txt");
        fs::create_dir_all(&blocked).unwrap();

        let options = CopyOptions {
            overwrite: Overwrite::Always,
            ..Default::default()
        };
        let err = copy(&src, &to, &options).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert_eq!(err.code(), "EIO");
        assert_eq!(err.path(), Some(blocked.as_path()));
        assert!(blocked.is_dir());
    }

    #[tokio::test]
    async fn async_existing_destination_untouched() {
        let dir = fixture();
        let to = dir.path().join("dst");
        fs::create_dir_all(&to).unwrap();
        fs::write(to.join("marker"), b"m").unwrap();

        let err = copy(&dir.path().join("src"), &to, &CopyOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(crate::ops::list_sync(&to).unwrap().unwrap(), ["marker"]);
    }
}
