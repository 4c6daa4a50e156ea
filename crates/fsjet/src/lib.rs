//! fsjet: filesystem convenience layer.
//!
//! This crate provides:
//!
//! - **Inspect**: one path to a [`Descriptor`], with optional mode, times and
//!   checksum; missing paths are `None`, not errors
//! - **Walk**: depth-first pre-order traversal, blocking ([`walk_sync`],
//!   [`WalkIter`]) or async ([`WalkStream`]), always in the same order
//! - **Find / Copy / Inspect-tree**: orchestrators built on the walker and
//!   the pattern matcher from `fsjet-glob`
//! - **Ops**: exists, list, mkdir -p, read, write (optionally atomic),
//!   remove and move
//! - **Jetpack**: a context that resolves relative paths against its own cwd
//!
//! Every operation comes as a blocking `_sync` function and an async twin on
//! `tokio::fs`. Both produce the same results.

pub mod checksum;
pub mod copy;
mod error;
pub mod find;
pub mod inspect;
pub mod jetpack;
pub mod ops;
pub mod paths;
pub mod tree;
pub mod walk;

pub use copy::{CopyOptions, DecideFn, Overwrite, copy, copy_sync};
pub use error::{Error, ErrorKind, Result};
pub use find::{FindOptions, find, find_sync};
pub use inspect::{InspectOptions, SymlinkMode, inspect, inspect_sync};
pub use jetpack::Jetpack;
pub use ops::{DirOptions, MoveOptions, WriteOptions};
pub use tree::{TreeOptions, inspect_tree, inspect_tree_sync};
pub use walk::{WalkEntry, WalkIter, WalkOptions, WalkStream, walk_iter, walk_stream, walk_sync};

// Data types and the matcher, for callers that only depend on this crate
pub use fsjet_glob::{MatchOptions, PatternError, PatternSet, create_matcher};
pub use fsjet_types::{
    Checksum, ChecksumAlgorithm, Descriptor, EntryKind, ExistsKind, Times, TreeNode,
};
