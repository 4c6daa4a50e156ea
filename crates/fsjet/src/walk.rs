//! Depth-first pre-order tree walker.
//!
//! Three ways to drive a walk:
//!
//! - [`walk_sync`]: blocking, calls a visitor once per entry before returning
//! - [`WalkIter`]: blocking, pull-based `Iterator`
//! - [`WalkStream`]: async, pull-based; one entry per `next().await`
//!
//! All three share the same [`Cursor`], so for a given tree and options they
//! produce the same entries in the same order. Only the I/O differs.
//!
//! Children are visited in directory enumeration order, unsorted. A missing
//! root is reported as one entry with no descriptor.

use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use fsjet_types::Descriptor;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::inspect::{InspectOptions, SymlinkMode, inspect, inspect_sync};

/// Options for a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WalkOptions {
    /// Maximum depth to expand (None = unlimited). The root is depth 0, so
    /// `Some(1)` visits the root and its direct children only.
    pub max_depth: Option<usize>,
    /// Fields computed for every visited entry.
    pub inspect: InspectOptions,
}

/// One visited entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkEntry {
    pub path: PathBuf,
    /// Distance from the walk root.
    pub depth: usize,
    /// `None` when the entry vanished, or the root never existed.
    pub descriptor: Option<Descriptor>,
}

impl WalkEntry {
    pub fn is_dir(&self) -> bool {
        self.descriptor.as_ref().is_some_and(Descriptor::is_dir)
    }
}

/// Children of one expanded directory that have not been visited yet.
///
/// The stack of frames is the way back up the tree: when a subtree runs out,
/// the frame below it holds the next sibling to resume from. A frame is dropped
/// as soon as its last child is handed out.
#[derive(Debug)]
struct Frame {
    dir: PathBuf,
    /// Depth of the entries in `pending`.
    depth: usize,
    pending: VecDeque<OsString>,
}

/// Traversal position of a walk.
#[derive(Debug)]
struct Cursor {
    frames: Vec<Frame>,
    next: Option<(PathBuf, usize)>,
    options: WalkOptions,
    /// Canonical paths of expanded directories, kept only when following
    /// symlinks.
    expanded: HashSet<PathBuf>,
}

impl Cursor {
    fn new(root: &Path, options: WalkOptions) -> Self {
        Self {
            frames: Vec::new(),
            next: Some((root.to_path_buf(), 0)),
            options,
            expanded: HashSet::new(),
        }
    }

    fn follows_symlinks(&self) -> bool {
        self.options.inspect.symlinks == SymlinkMode::Follow
    }

    fn wants_children(&self, depth: usize, descriptor: Option<&Descriptor>) -> bool {
        descriptor.is_some_and(Descriptor::is_dir)
            && self.options.max_depth.is_none_or(|max| depth < max)
    }

    /// Record a directory about to be expanded. False if its real location
    /// was already expanded in this walk.
    fn first_expansion(&mut self, canonical: PathBuf) -> bool {
        self.expanded.insert(canonical)
    }

    /// Queue the children of `dir` and move to the first of them.
    fn descend(&mut self, dir: PathBuf, depth: usize, names: Vec<OsString>) {
        if !names.is_empty() {
            self.frames.push(Frame {
                dir,
                depth: depth + 1,
                pending: names.into(),
            });
        }
        self.advance();
    }

    /// Move to the next unvisited sibling, climbing out of exhausted
    /// directories. Leaves `next` empty when the walk is over.
    fn advance(&mut self) {
        while let Some(frame) = self.frames.last_mut() {
            if let Some(name) = frame.pending.pop_front() {
                self.next = Some((frame.dir.join(name), frame.depth));
                return;
            }
            self.frames.pop();
        }
    }

    /// Abandon the walk; nothing more will be produced.
    fn halt(&mut self) {
        self.next = None;
        self.frames.clear();
    }

    fn step_sync(&mut self) -> Result<Option<WalkEntry>> {
        let Some((path, depth)) = self.next.take() else {
            return Ok(None);
        };

        let descriptor = inspect_sync(&path, &self.options.inspect)?;
        let mut expand = self.wants_children(depth, descriptor.as_ref());
        if expand && self.follows_symlinks() {
            let canonical = std::fs::canonicalize(&path).map_err(|e| Error::io(&path, e))?;
            expand = self.first_expansion(canonical);
            if !expand {
                tracing::debug!(path = %path.display(), "directory already walked, not expanding");
            }
        }

        if expand {
            let names = read_names_sync(&path)?;
            self.descend(path.clone(), depth, names);
        } else {
            self.advance();
        }

        Ok(Some(WalkEntry {
            path,
            depth,
            descriptor,
        }))
    }

    async fn step(&mut self) -> Result<Option<WalkEntry>> {
        let Some((path, depth)) = self.next.take() else {
            return Ok(None);
        };

        let descriptor = inspect(&path, &self.options.inspect).await?;
        let mut expand = self.wants_children(depth, descriptor.as_ref());
        if expand && self.follows_symlinks() {
            let canonical = tokio::fs::canonicalize(&path)
                .await
                .map_err(|e| Error::io(&path, e))?;
            expand = self.first_expansion(canonical);
            if !expand {
                tracing::debug!(path = %path.display(), "directory already walked, not expanding");
            }
        }

        if expand {
            let names = read_names(&path).await?;
            self.descend(path.clone(), depth, names);
        } else {
            self.advance();
        }

        Ok(Some(WalkEntry {
            path,
            depth,
            descriptor,
        }))
    }
}

fn read_names_sync(dir: &Path) -> Result<Vec<OsString>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    entries
        .map(|entry| entry.map(|e| e.file_name()).map_err(|e| Error::io(dir, e)))
        .collect()
}

async fn read_names(dir: &Path) -> Result<Vec<OsString>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| Error::io(dir, e))?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(dir, e))? {
        names.push(entry.file_name());
    }
    Ok(names)
}

/// Walk `root`, calling `visit` for every entry in pre-order.
///
/// Stops at the first error, whether from the filesystem or from `visit`.
pub fn walk_sync<F>(root: &Path, options: &WalkOptions, mut visit: F) -> Result<()>
where
    F: FnMut(&WalkEntry) -> Result<()>,
{
    tracing::debug!(root = %root.display(), max_depth = ?options.max_depth, "walk started");
    let mut cursor = Cursor::new(root, options.clone());
    let mut visited = 0usize;
    while let Some(entry) = cursor.step_sync()? {
        visit(&entry)?;
        visited += 1;
    }
    tracing::debug!(root = %root.display(), visited, "walk finished");
    Ok(())
}

/// Blocking pull-based walk.
#[derive(Debug)]
pub struct WalkIter {
    cursor: Cursor,
}

impl WalkIter {
    pub fn new(root: &Path, options: &WalkOptions) -> Self {
        Self {
            cursor: Cursor::new(root, options.clone()),
        }
    }
}

impl Iterator for WalkIter {
    type Item = Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.step_sync() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.cursor.halt();
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for WalkIter {}

/// Async pull-based walk.
///
/// Nothing is read until the first `next()`, and each call does only the I/O
/// needed for one entry. Dropping the walk part way through cancels it.
#[derive(Debug)]
pub struct WalkStream {
    cursor: Cursor,
}

impl WalkStream {
    pub fn new(root: &Path, options: &WalkOptions) -> Self {
        Self {
            cursor: Cursor::new(root, options.clone()),
        }
    }

    /// The next entry, `None` once the walk is over or has failed.
    pub async fn next(&mut self) -> Option<Result<WalkEntry>> {
        match self.cursor.step().await {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.cursor.halt();
                Some(Err(e))
            }
        }
    }

    /// Adapt into a [`Stream`] for use with `futures` combinators.
    pub fn into_stream(self) -> impl Stream<Item = Result<WalkEntry>> + Send {
        futures::stream::unfold(self, |mut walk| async move {
            walk.next().await.map(|item| (item, walk))
        })
    }
}

/// Start a blocking pull-based walk of `root`.
pub fn walk_iter(root: &Path, options: &WalkOptions) -> WalkIter {
    WalkIter::new(root, options)
}

/// Start an async pull-based walk of `root`.
pub fn walk_stream(root: &Path, options: &WalkOptions) -> WalkStream {
    WalkStream::new(root, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsjet_types::EntryKind;
    use futures::TryStreamExt;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("top.txt"), b"1").unwrap();
        fs::write(root.join("a/one.txt"), b"22").unwrap();
        fs::write(root.join("a/b/two.txt"), b"333").unwrap();
        dir
    }

    fn collect_sync(root: &Path, options: &WalkOptions) -> Vec<WalkEntry> {
        let mut out = Vec::new();
        walk_sync(root, options, |entry| {
            out.push(entry.clone());
            Ok(())
        })
        .unwrap();
        out
    }

    fn relative(root: &Path, entries: &[WalkEntry]) -> Vec<String> {
        let mut paths: Vec<String> = entries
            .iter()
            .map(|e| {
                e.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn visits_everything_preorder() {
        let dir = fixture();
        let entries = collect_sync(dir.path(), &WalkOptions::default());

        assert_eq!(entries[0].path, dir.path());
        assert_eq!(entries[0].depth, 0);
        assert_eq!(
            relative(dir.path(), &entries),
            ["", "a", "a/b", "a/b/two.txt", "a/one.txt", "empty", "top.txt"]
        );

        // Every entry comes after its parent.
        for (i, entry) in entries.iter().enumerate().skip(1) {
            let parent = entry.path.parent().unwrap();
            let parent_index = entries.iter().position(|e| e.path == parent).unwrap();
            assert!(parent_index < i);
            assert_eq!(entries[parent_index].depth + 1, entry.depth);
        }
    }

    #[test]
    fn subtrees_are_contiguous() {
        let dir = fixture();
        let entries = collect_sync(dir.path(), &WalkOptions::default());
        let a = dir.path().join("a");
        let start = entries.iter().position(|e| e.path == a).unwrap();
        let inside = entries[start + 1..]
            .iter()
            .take_while(|e| e.path.starts_with(&a))
            .count();
        // a/one.txt, a/b, a/b/two.txt
        assert_eq!(inside, 3);
    }

    #[test]
    fn max_depth_limits_expansion() {
        let dir = fixture();
        let options = WalkOptions {
            max_depth: Some(1),
            ..Default::default()
        };
        let entries = collect_sync(dir.path(), &options);
        assert_eq!(relative(dir.path(), &entries), ["", "a", "empty", "top.txt"]);

        let options = WalkOptions {
            max_depth: Some(0),
            ..Default::default()
        };
        assert_eq!(collect_sync(dir.path(), &options).len(), 1);
    }

    #[test]
    fn missing_root_yields_one_empty_entry() {
        let dir = fixture();
        let root = dir.path().join("nope");
        let entries = collect_sync(&root, &WalkOptions::default());
        assert_eq!(
            entries,
            [WalkEntry {
                path: root,
                depth: 0,
                descriptor: None
            }]
        );
    }

    #[test]
    fn file_root_is_single_entry() {
        let dir = fixture();
        let root = dir.path().join("top.txt");
        let entries = collect_sync(&root, &WalkOptions::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].descriptor.as_ref().unwrap().kind, EntryKind::File);
    }

    #[test]
    fn visitor_error_aborts() {
        let dir = fixture();
        let mut seen = 0;
        let result = walk_sync(dir.path(), &WalkOptions::default(), |_| {
            seen += 1;
            if seen == 2 {
                Err(Error::MalformedInput("stop".into()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert_eq!(seen, 2);
    }

    #[test]
    fn iterator_matches_visitor() {
        let dir = fixture();
        let options = WalkOptions::default();
        let visited = collect_sync(dir.path(), &options);
        let pulled: Vec<_> = walk_iter(dir.path(), &options)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(visited, pulled);
    }

    #[tokio::test]
    async fn stream_matches_visitor() {
        let dir = fixture();
        let options = WalkOptions {
            inspect: InspectOptions {
                mode: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let visited = collect_sync(dir.path(), &options);

        let mut walk = walk_stream(dir.path(), &options);
        let mut pulled = Vec::new();
        while let Some(entry) = walk.next().await {
            pulled.push(entry.unwrap());
        }
        assert_eq!(visited, pulled);
        assert!(walk.next().await.is_none());

        let streamed: Vec<_> = walk_stream(dir.path(), &options)
            .into_stream()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(visited, streamed);
    }

    #[tokio::test]
    async fn stream_is_lazy() {
        let dir = fixture();
        let mut walk = walk_stream(dir.path(), &WalkOptions::default());
        let first = walk.next().await.unwrap().unwrap();
        assert_eq!(first.path, dir.path());
        // Dropping here abandons the rest of the walk.
        drop(walk);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_reported_are_not_expanded() {
        let dir = fixture();
        std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("link")).unwrap();
        let entries = collect_sync(dir.path(), &WalkOptions::default());
        let link = entries
            .iter()
            .find(|e| e.path.ends_with("link"))
            .unwrap();
        assert_eq!(link.descriptor.as_ref().unwrap().kind, EntryKind::Symlink);
        assert!(!entries.iter().any(|e| e.path.starts_with(dir.path().join("link/b"))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_cycle_is_expanded_once() {
        let dir = fixture();
        // a/b/loop -> a
        std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("a/b/loop")).unwrap();
        let options = WalkOptions {
            inspect: InspectOptions {
                symlinks: SymlinkMode::Follow,
                ..Default::default()
            },
            ..Default::default()
        };

        let visited = collect_sync(dir.path(), &options);
        let looped = visited
            .iter()
            .find(|e| e.path.ends_with("loop"))
            .unwrap();
        assert!(looped.is_dir());
        assert!(!visited.iter().any(|e| e.path.starts_with(dir.path().join("a/b/loop/b"))));

        let streamed: Vec<_> = walk_stream(dir.path(), &options)
            .into_stream()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(visited, streamed);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_fails_and_fuses() {
        use std::os::unix::fs::PermissionsExt;

        let dir = fixture();
        let locked = dir.path().join("a");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users can read anything; nothing to test then.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut iter = walk_iter(dir.path(), &WalkOptions::default());
        let results: Vec<_> = iter.by_ref().collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let err = results.last().unwrap().as_ref().unwrap_err();
        assert_eq!(err.path(), Some(locked.as_path()));
        assert!(iter.next().is_none());
    }
}
