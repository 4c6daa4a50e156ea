//! Inspect-tree results.

use serde::{Deserialize, Serialize};

use crate::descriptor::{Descriptor, EntryKind};

/// One node of an inspect-tree result.
///
/// Built bottom-up and never mutated afterwards: a directory's `size` and
/// `checksum` always agree with its `children`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub entry: Descriptor,
    /// `.` for the root, `./child/grandchild` below it. Only set when asked for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    /// Present exactly when the node is a directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn kind(&self) -> EntryKind {
        self.entry.kind
    }

    /// Byte size; zero when the entry carries none (symlinks, other).
    pub fn size(&self) -> u64 {
        self.entry.size.unwrap_or(0)
    }

    /// Child nodes; empty for anything but directories.
    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Look up a direct child by name.
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children().iter().find(|c| c.name() == name)
    }

    /// Depth-first pre-order iterator over this node and its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children().iter().rev());
            Some(node)
        })
    }
}
