//! Find: walk a directory and collect the paths that match a pattern set.

use std::path::{Path, PathBuf};

use fsjet_glob::{MatchOptions, PatternSet};
use fsjet_types::{Descriptor, EntryKind};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::inspect::{InspectOptions, SymlinkMode, inspect, inspect_sync};
use crate::paths::relative;
use crate::walk::{WalkEntry, WalkOptions, WalkStream, walk_sync};

/// Options for [`find`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FindOptions {
    /// Patterns, anchored at the search root. See [`PatternSet`].
    pub matching: Vec<String>,
    /// Report files.
    pub files: bool,
    /// Report directories.
    pub directories: bool,
    /// Descend below the direct children of the root.
    pub recursive: bool,
    pub ignore_case: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            matching: vec!["*".to_string()],
            files: true,
            directories: false,
            recursive: true,
            ignore_case: false,
        }
    }
}

impl FindOptions {
    fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            max_depth: if self.recursive { None } else { Some(1) },
            inspect: InspectOptions {
                symlinks: SymlinkMode::Follow,
                ..Default::default()
            },
        }
    }

    fn matcher(&self, root: &Path) -> Result<PatternSet> {
        let options = MatchOptions {
            ignore_case: self.ignore_case,
        };
        Ok(PatternSet::with_options(root, &self.matching, options)?)
    }

    fn wants(&self, descriptor: &Descriptor) -> bool {
        match descriptor.kind {
            EntryKind::File => self.files,
            EntryKind::Dir => self.directories,
            EntryKind::Symlink | EntryKind::Other => false,
        }
    }
}

fn check_root(root: &Path, descriptor: Option<Descriptor>) -> Result<()> {
    match descriptor {
        None => Err(Error::not_found(
            root,
            "Path you want to find stuff in doesn't exist",
        )),
        Some(d) if !d.is_dir() => Err(Error::not_a_directory(
            root,
            "Path you want to find stuff in must be a directory",
        )),
        Some(_) => Ok(()),
    }
}

/// Collects matches as the walk goes.
struct Collector<'a> {
    options: &'a FindOptions,
    matcher: PatternSet,
    relative_to: &'a Path,
    found: Vec<PathBuf>,
}

impl Collector<'_> {
    fn visit(&mut self, entry: &WalkEntry) {
        // The root itself is never a result.
        if entry.depth == 0 {
            return;
        }
        let Some(descriptor) = &entry.descriptor else {
            return;
        };
        if self.options.wants(descriptor) && self.matcher.is_match(&entry.path) {
            self.found.push(relative(self.relative_to, &entry.path));
        }
    }
}

/// Find entries under `root`, blocking. Results are relative to
/// `relative_to`, in walk order.
///
/// Fails with NotFound when `root` is absent and NotADirectory when it is
/// not a directory.
#[tracing::instrument(level = "debug", skip(options), fields(patterns = ?options.matching))]
pub fn find_sync(root: &Path, options: &FindOptions, relative_to: &Path) -> Result<Vec<PathBuf>> {
    let matcher = options.matcher(root)?;
    let walk_options = options.walk_options();
    check_root(root, inspect_sync(root, &walk_options.inspect)?)?;

    let mut collector = Collector {
        options,
        matcher,
        relative_to,
        found: Vec::new(),
    };
    walk_sync(root, &walk_options, |entry| {
        collector.visit(entry);
        Ok(())
    })?;
    tracing::debug!(found = collector.found.len(), "find finished");
    Ok(collector.found)
}

/// Find entries under `root`. Results are relative to `relative_to`, in walk
/// order.
#[tracing::instrument(level = "debug", skip(options), fields(patterns = ?options.matching))]
pub async fn find(root: &Path, options: &FindOptions, relative_to: &Path) -> Result<Vec<PathBuf>> {
    let matcher = options.matcher(root)?;
    let walk_options = options.walk_options();
    check_root(root, inspect(root, &walk_options.inspect).await?)?;

    let mut collector = Collector {
        options,
        matcher,
        relative_to,
        found: Vec::new(),
    };
    let mut walk = WalkStream::new(root, &walk_options);
    while let Some(entry) = walk.next().await {
        collector.visit(&entry?);
    }
    tracing::debug!(found = collector.found.len(), "find finished");
    Ok(collector.found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("x/y/b")).unwrap();
        fs::write(root.join("x/file.txt"), b"").unwrap();
        fs::write(root.join("x/y/file.txt"), b"").unwrap();
        fs::write(root.join("x/y/b/file.txt"), b"").unwrap();
        fs::write(root.join("x/y/notes.md"), b"").unwrap();
        dir
    }

    fn sorted(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths.sort();
        paths
    }

    fn find_in(dir: &TempDir, root: &str, options: &FindOptions) -> Vec<PathBuf> {
        sorted(find_sync(&dir.path().join(root), options, dir.path()).unwrap())
    }

    #[test]
    fn default_finds_all_files() {
        let dir = fixture();
        let found = find_in(&dir, "x", &FindOptions::default());
        assert_eq!(
            found,
            [
                PathBuf::from("x/file.txt"),
                PathBuf::from("x/y/b/file.txt"),
                PathBuf::from("x/y/file.txt"),
                PathBuf::from("x/y/notes.md"),
            ]
        );
    }

    #[test]
    fn directories_only() {
        let dir = fixture();
        let options = FindOptions {
            files: false,
            directories: true,
            ..Default::default()
        };
        assert_eq!(
            find_in(&dir, "x", &options),
            [PathBuf::from("x/y"), PathBuf::from("x/y/b")]
        );
    }

    #[test]
    fn anchored_pattern() {
        let dir = fixture();
        let options = FindOptions {
            matching: vec!["y/*.txt".into()],
            ..Default::default()
        };
        assert_eq!(find_in(&dir, "x", &options), [PathBuf::from("x/y/file.txt")]);
    }

    #[test]
    fn ignore_case() {
        let dir = fixture();
        let options = FindOptions {
            matching: vec!["*.MD".into()],
            ignore_case: true,
            ..Default::default()
        };
        assert_eq!(find_in(&dir, "x", &options), [PathBuf::from("x/y/notes.md")]);
    }

    #[test]
    fn relative_to_other_directory() {
        let dir = fixture();
        let options = FindOptions {
            matching: vec!["*.md".into()],
            ..Default::default()
        };
        let found = find_sync(&dir.path().join("x"), &options, &dir.path().join("x/y/b")).unwrap();
        assert_eq!(found, [PathBuf::from("../notes.md")]);
    }

    #[test]
    fn root_errors() {
        let dir = fixture();
        let err = find_sync(&dir.path().join("nope"), &FindOptions::default(), dir.path())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("doesn't exist"));

        let err = find_sync(&dir.path().join("x/file.txt"), &FindOptions::default(), dir.path())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let dir = fixture();
        let options = FindOptions {
            matching: vec![String::new()],
            ..Default::default()
        };
        let err = find_sync(&dir.path().join("x"), &options, dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlinked_directories() {
        let dir = fixture();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("far.txt"), b"").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("x/linked")).unwrap();

        let found = find_in(&dir, "x", &FindOptions::default());
        assert!(found.contains(&PathBuf::from("x/linked/far.txt")));
    }

    #[tokio::test]
    async fn async_matches_sync() {
        let dir = fixture();
        let root = dir.path().join("x");
        for options in [
            FindOptions::default(),
            FindOptions {
                recursive: false,
                directories: true,
                ..Default::default()
            },
        ] {
            let sync = find_sync(&root, &options, dir.path()).unwrap();
            let not_sync = find(&root, &options, dir.path()).await.unwrap();
            assert_eq!(sync, not_sync);
        }
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: FindOptions = serde_json::from_str(r#"{"directories": true}"#).unwrap();
        assert_eq!(options.matching, ["*"]);
        assert!(options.files);
        assert!(options.directories);
        assert!(options.recursive);
    }
}
