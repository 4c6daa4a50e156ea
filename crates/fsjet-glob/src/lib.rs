//! fsjet-glob: Glob matching for fsjet.
//!
//! [`PatternSet`] holds ordered include/negate patterns anchored at a base
//! directory; it is the matcher used by find and copy. Patterns are
//! shell-style globs with brace expansion, extglob groups (`@(a|b)`,
//! `+(..)`, `*(..)`, `?(..)`) and `**` spanning directories.
//!
//! Everything here is pure string work; no filesystem access happens.

mod glob;
mod glob_path;
mod pattern_set;

pub use glob_path::PatternError;
pub use pattern_set::{MatchOptions, PatternSet, create_matcher};
