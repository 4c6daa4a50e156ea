//! Path-scoped context over the operations in this crate.
//!
//! A [`Jetpack`] carries its own working directory. Relative paths given to
//! its methods resolve against it, and `cd` derives a new context instead of
//! touching the process cwd.

use std::path::{Path, PathBuf};

use fsjet_types::{Descriptor, ExistsKind, TreeNode};

use crate::copy::{self, CopyOptions};
use crate::error::{Error, Result};
use crate::find::{self, FindOptions};
use crate::inspect::{self, InspectOptions};
use crate::ops::{self, DirOptions, MoveOptions, WriteOptions};
use crate::paths::{normalize, resolve};
use crate::tree::{self, TreeOptions};
use crate::walk::{WalkIter, WalkOptions, WalkStream};

/// Filesystem context rooted at a working directory.
///
/// ```no_run
/// use fsjet::{FindOptions, Jetpack};
///
/// # fn main() -> fsjet::Result<()> {
/// let project = Jetpack::new()?.cd("project");
/// project.write_sync("notes/todo.txt", "ship it", &Default::default())?;
/// let text_files = project.find_sync(".", &FindOptions {
///     matching: vec!["*.txt".into()],
///     ..Default::default()
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jetpack {
    cwd: PathBuf,
}

impl Jetpack {
    /// Context at the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| Error::io(".", e))?;
        Ok(Self { cwd })
    }

    /// Context at `cwd`; a relative `cwd` is taken against the process
    /// working directory.
    pub fn at(cwd: impl AsRef<Path>) -> Result<Self> {
        let cwd = cwd.as_ref();
        let absolute = std::path::absolute(cwd).map_err(|e| Error::io(cwd, e))?;
        Ok(Self {
            cwd: normalize(&absolute),
        })
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// New context with the working directory moved to `path`.
    pub fn cd(&self, path: impl AsRef<Path>) -> Self {
        Self {
            cwd: resolve(&self.cwd, path),
        }
    }

    /// Resolve `parts`, in order, against the working directory.
    pub fn path<I, P>(&self, parts: I) -> PathBuf
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let joined = parts
            .into_iter()
            .fold(self.cwd.clone(), |acc, part| acc.join(part));
        normalize(&joined)
    }

    fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        resolve(&self.cwd, path)
    }

    // -----------------------------------------------------------------------
    // inspection
    // -----------------------------------------------------------------------

    pub fn exists_sync(&self, path: impl AsRef<Path>) -> Result<ExistsKind> {
        ops::exists_sync(&self.resolve(path))
    }

    pub async fn exists(&self, path: impl AsRef<Path>) -> Result<ExistsKind> {
        ops::exists(&self.resolve(path)).await
    }

    pub fn inspect_sync(
        &self,
        path: impl AsRef<Path>,
        options: &InspectOptions,
    ) -> Result<Option<Descriptor>> {
        inspect::inspect_sync(&self.resolve(path), options)
    }

    pub async fn inspect(
        &self,
        path: impl AsRef<Path>,
        options: &InspectOptions,
    ) -> Result<Option<Descriptor>> {
        inspect::inspect(&self.resolve(path), options).await
    }

    pub fn inspect_tree_sync(
        &self,
        path: impl AsRef<Path>,
        options: &TreeOptions,
    ) -> Result<Option<TreeNode>> {
        tree::inspect_tree_sync(&self.resolve(path), options)
    }

    pub async fn inspect_tree(
        &self,
        path: impl AsRef<Path>,
        options: &TreeOptions,
    ) -> Result<Option<TreeNode>> {
        tree::inspect_tree(&self.resolve(path), options).await
    }

    pub fn list_sync(&self, path: impl AsRef<Path>) -> Result<Option<Vec<String>>> {
        ops::list_sync(&self.resolve(path))
    }

    pub async fn list(&self, path: impl AsRef<Path>) -> Result<Option<Vec<String>>> {
        ops::list(&self.resolve(path)).await
    }

    // -----------------------------------------------------------------------
    // traversal
    // -----------------------------------------------------------------------

    pub fn walk_iter(&self, path: impl AsRef<Path>, options: &WalkOptions) -> WalkIter {
        WalkIter::new(&self.resolve(path), options)
    }

    pub fn walk_stream(&self, path: impl AsRef<Path>, options: &WalkOptions) -> WalkStream {
        WalkStream::new(&self.resolve(path), options)
    }

    /// Find under `path`; results are relative to this context's cwd.
    pub fn find_sync(&self, path: impl AsRef<Path>, options: &FindOptions) -> Result<Vec<PathBuf>> {
        find::find_sync(&self.resolve(path), options, &self.cwd)
    }

    /// Find under `path`; results are relative to this context's cwd.
    pub async fn find(&self, path: impl AsRef<Path>, options: &FindOptions) -> Result<Vec<PathBuf>> {
        find::find(&self.resolve(path), options, &self.cwd).await
    }

    // -----------------------------------------------------------------------
    // mutation
    // -----------------------------------------------------------------------

    /// Ensure a directory exists and return a context inside it.
    pub fn dir_sync(&self, path: impl AsRef<Path>, options: &DirOptions) -> Result<Jetpack> {
        let path = self.resolve(path);
        ops::ensure_dir_sync(&path, options)?;
        Ok(Self { cwd: path })
    }

    /// Ensure a directory exists and return a context inside it.
    pub async fn dir(&self, path: impl AsRef<Path>, options: &DirOptions) -> Result<Jetpack> {
        let path = self.resolve(path);
        ops::ensure_dir(&path, options).await?;
        Ok(Self { cwd: path })
    }

    pub fn read_sync(&self, path: impl AsRef<Path>) -> Result<Option<Vec<u8>>> {
        ops::read_sync(&self.resolve(path))
    }

    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Option<Vec<u8>>> {
        ops::read(&self.resolve(path)).await
    }

    pub fn read_to_string_sync(&self, path: impl AsRef<Path>) -> Result<Option<String>> {
        ops::read_to_string_sync(&self.resolve(path))
    }

    pub async fn read_to_string(&self, path: impl AsRef<Path>) -> Result<Option<String>> {
        ops::read_to_string(&self.resolve(path)).await
    }

    pub fn write_sync(
        &self,
        path: impl AsRef<Path>,
        data: impl AsRef<[u8]>,
        options: &WriteOptions,
    ) -> Result<()> {
        ops::write_sync(&self.resolve(path), data, options)
    }

    pub async fn write(
        &self,
        path: impl AsRef<Path>,
        data: impl AsRef<[u8]>,
        options: &WriteOptions,
    ) -> Result<()> {
        ops::write(&self.resolve(path), data, options).await
    }

    pub fn copy_sync(
        &self,
        from: impl AsRef<Path>,
        to: impl AsRef<Path>,
        options: &CopyOptions,
    ) -> Result<()> {
        copy::copy_sync(&self.resolve(from), &self.resolve(to), options)
    }

    pub async fn copy(
        &self,
        from: impl AsRef<Path>,
        to: impl AsRef<Path>,
        options: &CopyOptions,
    ) -> Result<()> {
        copy::copy(&self.resolve(from), &self.resolve(to), options).await
    }

    pub fn move_sync(
        &self,
        from: impl AsRef<Path>,
        to: impl AsRef<Path>,
        options: &MoveOptions,
    ) -> Result<()> {
        ops::move_sync(&self.resolve(from), &self.resolve(to), options)
    }

    pub async fn move_to(
        &self,
        from: impl AsRef<Path>,
        to: impl AsRef<Path>,
        options: &MoveOptions,
    ) -> Result<()> {
        ops::move_to(&self.resolve(from), &self.resolve(to), options).await
    }

    pub fn remove_sync(&self, path: impl AsRef<Path>) -> Result<()> {
        ops::remove_sync(&self.resolve(path))
    }

    pub async fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
        ops::remove(&self.resolve(path)).await
    }
}
