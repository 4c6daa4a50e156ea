//! Lexical path helpers. Nothing here touches the filesystem, so symlinks
//! are not resolved.

use std::path::{Component, Path, PathBuf};

/// Remove `.` components and apply `..` against the preceding component.
///
/// A `..` that would climb above the root is dropped; above the start of a
/// relative path it is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Resolve `path` against `base` (unless it is already absolute) and
/// normalize the result.
pub fn resolve(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    normalize(&base.join(path))
}

/// The path that leads from directory `from` to `to`.
///
/// Both are normalized first. Equal paths give the empty path.
///
/// ```
/// use fsjet::paths::relative;
/// use std::path::Path;
///
/// assert_eq!(relative(Path::new("/a/b"), Path::new("/a/c/d")), Path::new("../c/d"));
/// assert_eq!(relative(Path::new("/a"), Path::new("/a/x.txt")), Path::new("x.txt"));
/// ```
pub fn relative(from: &Path, to: &Path) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);
    let from: Vec<_> = from.components().filter(|c| *c != Component::CurDir).collect();
    let to: Vec<_> = to.components().filter(|c| *c != Component::CurDir).collect();

    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component);
    }
    out
}
