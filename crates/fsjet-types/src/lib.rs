//! Pure data types for fsjet: entry descriptors, checksums, inspect trees.
//!
//! This crate is a leaf dependency with no async runtime and no I/O. It exists
//! so that consumers can work with fsjet's results without pulling in the
//! walker and its tokio dependency.

pub mod checksum;
pub mod descriptor;
pub mod tree;

// Flat re-exports for convenience
pub use checksum::*;
pub use descriptor::*;
pub use tree::*;
