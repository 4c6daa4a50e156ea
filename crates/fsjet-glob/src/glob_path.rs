//! Path-aware glob matching with globstar (`**`) support.
//!
//! Extends the component matching in `glob.rs` to patterns that span
//! directory boundaries:
//!
//! - `**/*.rs` matches `foo.rs`, `src/foo.rs`, `a/b/c/foo.rs`
//! - `src/**` matches `src` and everything under it
//! - `a/**/z` matches `a/z`, `a/b/z`, `a/b/c/z`

use std::path::{Component, Path};

use thiserror::Error;

use crate::glob::{Glob, contains_glob, expand_braces};

/// Errors when parsing glob patterns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,
    #[error("invalid pattern: {0}")]
    Invalid(String),
}

/// A segment of a path pattern.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PathSegment {
    /// Literal directory or file name: "src", "main.rs"
    Literal(String),
    /// Pattern with wildcards: "*.rs", "test_?", "{a,b}". Holds one compiled
    /// glob per brace alternative.
    Pattern(Vec<Glob>),
    /// Globstar: matches zero or more directory components
    Globstar,
}

/// A path pattern split into segments. A leading `/` is dropped; callers
/// decide what the pattern is anchored to.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GlobPath {
    segments: Vec<PathSegment>,
}

impl GlobPath {
    pub(crate) fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();

        for part in split_segments(pattern) {
            if part.is_empty() {
                continue;
            }

            if part == "**" {
                // Consecutive globstars collapse to one
                if !matches!(segments.last(), Some(PathSegment::Globstar)) {
                    segments.push(PathSegment::Globstar);
                }
            } else {
                segments.push(Self::segment(part));
            }
        }

        GlobPath { segments }
    }

    fn segment(part: &str) -> PathSegment {
        if !contains_glob(part) && !part.contains('\\') {
            return PathSegment::Literal(part.to_string());
        }

        let globs: Vec<Glob> = expand_braces(part).iter().map(|p| Glob::new(p)).collect();
        match globs.as_slice() {
            [only] => match only.as_literal() {
                Some(lit) => PathSegment::Literal(lit),
                None => PathSegment::Pattern(globs),
            },
            _ => PathSegment::Pattern(globs),
        }
    }

    /// Put literal components in front of the pattern and resolve `.` and
    /// `..` lexically. Used to anchor a relative pattern at a base directory.
    pub(crate) fn prefixed<S: AsRef<str>>(self, prefix: &[S]) -> Self {
        let mut segments: Vec<PathSegment> =
            Vec::with_capacity(prefix.len() + self.segments.len());
        let literals = prefix
            .iter()
            .map(|p| PathSegment::Literal(p.as_ref().to_string()));

        for segment in literals.chain(self.segments) {
            let literal = match &segment {
                PathSegment::Literal(s) => Some(s.as_str()),
                _ => None,
            };
            match literal {
                Some(".") => continue,
                Some("..") if matches!(segments.last(), Some(PathSegment::Literal(s)) if s != "..") => {
                    segments.pop();
                    continue;
                }
                _ => {}
            }
            segments.push(segment);
        }

        GlobPath { segments }
    }

    /// Match already-split path components.
    pub(crate) fn matches_components(&self, components: &[&str], ignore_case: bool) -> bool {
        match_segments(&self.segments, components, ignore_case)
    }
}

/// Split on `/`, except inside extglob parentheses.
fn split_segments(pattern: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in pattern.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                parts.push(&pattern[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&pattern[start..]);
    parts
}

/// Lexically normalized components of a path: `.` dropped, `..` applied,
/// root markers skipped. Non-UTF-8 names are converted lossily.
pub(crate) fn path_components(path: &Path) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => {
                out.push(prefix.as_os_str().to_string_lossy().into_owned());
            }
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name.to_string_lossy().into_owned()),
        }
    }
    out
}

/// Recursive segment matching with backtracking for globstar.
fn match_segments(segments: &[PathSegment], components: &[&str], ignore_case: bool) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        // Segments exhausted: match only if the components are too
        return components.is_empty();
    };

    match segment {
        PathSegment::Globstar => {
            // Globstar matches zero or more components
            (0..=components.len()).any(|skip| match_segments(rest, &components[skip..], ignore_case))
        }

        PathSegment::Literal(lit) => match components.split_first() {
            Some((first, tail)) => {
                let same = if ignore_case {
                    first.to_lowercase() == lit.to_lowercase()
                } else {
                    first == lit
                };
                same && match_segments(rest, tail, ignore_case)
            }
            None => false,
        },

        PathSegment::Pattern(globs) => match components.split_first() {
            Some((first, tail)) => {
                globs.iter().any(|g| g.is_match(first, ignore_case))
                    && match_segments(rest, tail, ignore_case)
            }
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        matches_path(&GlobPath::parse(pattern), path)
    }

    fn matches_path(glob: &GlobPath, path: &str) -> bool {
        let components = path_components(Path::new(path));
        let refs: Vec<&str> = components.iter().map(String::as_str).collect();
        glob.matches_components(&refs, false)
    }

    #[test]
    fn test_literal_pattern() {
        assert!(matches("src/main.rs", "src/main.rs"));
        assert!(!matches("src/main.rs", "src/lib.rs"));
        assert!(!matches("src/main.rs", "main.rs"));
    }

    #[test]
    fn test_simple_wildcard() {
        assert!(matches("*.rs", "main.rs"));
        assert!(!matches("*.rs", "main.go"));
        assert!(!matches("*.rs", "src/main.rs")); // one component only
    }

    #[test]
    fn test_globstar_prefix() {
        assert!(matches("**/*.rs", "main.rs"));
        assert!(matches("**/*.rs", "src/lib/utils.rs"));
        assert!(matches("**/*.rs", "a/b/c/d/e.rs"));
        assert!(!matches("**/*.rs", "src/main.go"));
    }

    #[test]
    fn test_globstar_suffix() {
        assert!(matches("src/**", "src"));
        assert!(matches("src/**", "src/lib/utils.rs"));
        assert!(!matches("src/**", "test/main.rs"));
    }

    #[test]
    fn test_globstar_middle() {
        assert!(matches("a/**/z", "a/z"));
        assert!(matches("a/**/z", "a/b/c/z"));
        assert!(!matches("a/**/z", "b/c/z"));
        assert!(!matches("a/**/z", "a/z/extra"));

        assert_eq!(GlobPath::parse("a/**/**/z").segments.len(), 3);
    }

    #[test]
    fn test_brace_expansion_per_segment() {
        assert!(matches("**/*.{rs,go}", "src/lib.go"));
        assert!(matches("**/*.{rs,go}", "a/b/c/d.rs"));
        assert!(!matches("**/*.{rs,go}", "src/main.py"));
    }

    #[test]
    fn test_extglob_segment_with_pipe_and_slash_inside() {
        assert!(matches("src/@(lib|bin)/*.rs", "src/lib/a.rs"));
        assert!(matches("src/@(lib|bin)/*.rs", "src/bin/b.rs"));
        assert!(!matches("src/@(lib|bin)/*.rs", "src/test/c.rs"));
        assert_eq!(split_segments("a/@(b/c|d)/e"), vec!["a", "@(b/c|d)", "e"]);
    }

    #[test]
    fn test_escaped_literal_segment() {
        let pat = GlobPath::parse("docs/\\*.md");
        assert_eq!(pat.segments[1], PathSegment::Literal("*.md".into()));
        assert!(matches_path(&pat, "docs/*.md"));
        assert!(!matches_path(&pat, "docs/readme.md"));
    }

    #[test]
    fn test_hidden_files() {
        assert!(matches("**/*.rs", ".hidden.rs"));
        assert!(matches("**/*.rs", ".config/settings.rs"));
    }

    #[test]
    fn test_leading_slash_is_dropped() {
        assert_eq!(GlobPath::parse("/src/*.rs"), GlobPath::parse("src/*.rs"));
        assert!(matches("/src/*.rs", "/src/main.rs"));
    }

    #[test]
    fn test_prefixed_resolves_dots() {
        let pat = GlobPath::parse("./a/../b/*.txt").prefixed(&["x", "y"]);
        assert!(matches_path(&pat, "/x/y/b/f.txt"));
        assert!(!matches_path(&pat, "/x/y/a/b/f.txt"));

        let up = GlobPath::parse("../*.txt").prefixed(&["x", "y"]);
        assert!(matches_path(&up, "/x/f.txt"));
    }

    #[test]
    fn test_case_folding() {
        let pat = GlobPath::parse("SRC/*.RS");
        assert!(pat.matches_components(&["src", "main.rs"], true));
        assert!(!pat.matches_components(&["src", "main.rs"], false));
    }

    #[test]
    fn test_path_components_normalizes() {
        assert_eq!(path_components(Path::new("/a/./b/../c")), vec!["a", "c"]);
        assert_eq!(path_components(Path::new("rel/x")), vec!["rel", "x"]);
    }
}
