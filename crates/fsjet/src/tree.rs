//! Inspect-tree: a nested snapshot of a subtree with aggregated sizes and
//! checksums.

use std::path::Path;

use fsjet_types::{ChecksumAlgorithm, Descriptor, TreeNode};
use serde::Deserialize;

use crate::checksum::aggregate;
use crate::error::Result;
use crate::inspect::{InspectOptions, SymlinkMode};
use crate::walk::{WalkEntry, WalkOptions, WalkStream, walk_sync};

/// Options for [`inspect_tree`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Digest files, and aggregate directory digests, with this algorithm.
    pub checksum: Option<ChecksumAlgorithm>,
    /// Fill in `relative_path` on every node.
    pub relative_path: bool,
    pub symlinks: SymlinkMode,
    pub times: bool,
}

impl TreeOptions {
    fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            max_depth: None,
            inspect: InspectOptions {
                checksum: self.checksum,
                times: self.times,
                symlinks: self.symlinks,
                ..Default::default()
            },
        }
    }
}

/// A directory whose children are still arriving.
struct OpenDir {
    entry: Descriptor,
    relative_path: String,
    children: Vec<TreeNode>,
}

/// Assembles nodes from a pre-order walk.
///
/// Directories stay open on a stack until an entry at their depth or above
/// shows up, at which point they are closed: size and checksum are computed
/// from the finished children and the node is attached to its parent.
struct TreeBuilder<'a> {
    options: &'a TreeOptions,
    open: Vec<OpenDir>,
    root: Option<TreeNode>,
}

impl<'a> TreeBuilder<'a> {
    fn new(options: &'a TreeOptions) -> Self {
        Self {
            options,
            open: Vec::new(),
            root: None,
        }
    }

    fn push(&mut self, entry: WalkEntry) {
        // A vanished entry has nothing to describe.
        let Some(descriptor) = entry.descriptor else {
            return;
        };

        while self.open.len() > entry.depth {
            self.close();
        }

        let relative_path = match self.open.last() {
            Some(parent) => format!("{}/{}", parent.relative_path, descriptor.name),
            None => ".".to_string(),
        };

        if descriptor.is_dir() {
            self.open.push(OpenDir {
                entry: descriptor,
                relative_path,
                children: Vec::new(),
            });
        } else {
            let node = TreeNode {
                entry: descriptor,
                relative_path: self.options.relative_path.then_some(relative_path),
                children: None,
            };
            self.attach(node);
        }
    }

    fn close(&mut self) {
        let Some(dir) = self.open.pop() else {
            return;
        };
        let mut children = dir.children;
        // Listing order depends on the filesystem; name order keeps digests stable.
        children.sort_by(|a, b| a.name().cmp(b.name()));

        let mut entry = dir.entry;
        entry.size = Some(children.iter().map(TreeNode::size).sum());
        if let Some(algorithm) = self.options.checksum {
            let parts = children
                .iter()
                .map(|child| (child.name(), child.entry.checksum.as_ref()));
            entry.checksum = Some(aggregate(parts, algorithm));
        }

        let node = TreeNode {
            entry,
            relative_path: self.options.relative_path.then_some(dir.relative_path),
            children: Some(children),
        };
        self.attach(node);
    }

    fn attach(&mut self, node: TreeNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root = Some(node),
        }
    }

    fn finish(mut self) -> Option<TreeNode> {
        while !self.open.is_empty() {
            self.close();
        }
        self.root
    }
}

/// Inspect the subtree at `path`, blocking. `Ok(None)` when it does not exist.
#[tracing::instrument(level = "debug", skip(options))]
pub fn inspect_tree_sync(path: &Path, options: &TreeOptions) -> Result<Option<TreeNode>> {
    let mut builder = TreeBuilder::new(options);
    walk_sync(path, &options.walk_options(), |entry| {
        builder.push(entry.clone());
        Ok(())
    })?;
    Ok(builder.finish())
}

/// Inspect the subtree at `path`. `Ok(None)` when it does not exist.
#[tracing::instrument(level = "debug", skip(options))]
pub async fn inspect_tree(path: &Path, options: &TreeOptions) -> Result<Option<TreeNode>> {
    let mut builder = TreeBuilder::new(options);
    let mut walk = WalkStream::new(path, &options.walk_options());
    while let Some(entry) = walk.next().await {
        builder.push(entry?);
    }
    Ok(builder.finish())
}
