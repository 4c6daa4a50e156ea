//! Ordered include/negate pattern sets anchored at a base directory.
//!
//! A raw pattern is classified once, at compile time:
//!
//! - no `/` at all: matched against the last path component, anywhere in
//!   the tree (`*.txt`, `.env`, `**`)
//! - leading `/`: matched against the whole path as written
//! - anything else with a `/`: anchored at the base directory; a leading
//!   `./` is dropped (`a/*.txt`, `./a.txt`, `../shared/*.rs`)
//!
//! A leading `!` negates the pattern. Evaluation follows declaration order:
//! positive patterns are consulted until the first negated one; from there
//! on every negated pattern whose body matches rejects the path. When the
//! very first pattern is negated, everything starts out matching, so a set
//! made only of negations is a deny-list.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::glob::expand_braces;
use crate::glob_path::{GlobPath, PatternError, path_components};

/// Options applied to every pattern of a set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Compare names case-insensitively.
    pub ignore_case: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// Match the final path component only.
    Basename,
    /// Match the whole normalized path.
    Path,
}

#[derive(Clone)]
struct CompiledPattern {
    raw: String,
    negated: bool,
    anchor: Anchor,
    /// One glob per top-level brace alternative.
    alternatives: Vec<GlobPath>,
}

impl CompiledPattern {
    fn compile(raw: &str, base: &[String]) -> Result<Self, PatternError> {
        let (body, negated) = match raw.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        if body.is_empty() {
            return Err(PatternError::Empty);
        }

        let anchor = if body.contains('/') {
            Anchor::Path
        } else {
            Anchor::Basename
        };

        let rooted = body.starts_with('/');
        let body = body.strip_prefix("./").unwrap_or(body);

        let alternatives = expand_braces(body)
            .iter()
            .map(|expanded| {
                let glob = GlobPath::parse(expanded);
                if anchor == Anchor::Path && !rooted {
                    glob.prefixed(base)
                } else {
                    glob
                }
            })
            .collect();

        Ok(Self {
            raw: raw.to_string(),
            negated,
            anchor,
            alternatives,
        })
    }

    /// Whether the pattern body (ignoring negation) matches.
    fn body_matches(&self, components: &[&str], ignore_case: bool) -> bool {
        let subject: &[&str] = match self.anchor {
            Anchor::Basename => match components.last() {
                Some(_) => &components[components.len() - 1..],
                None => &[""],
            },
            Anchor::Path => components,
        };
        self.alternatives
            .iter()
            .any(|glob| glob.matches_components(subject, ignore_case))
    }
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPattern")
            .field("raw", &self.raw)
            .field("anchor", &self.anchor)
            .finish()
    }
}

/// A compiled, ordered set of patterns.
///
/// # Examples
/// ```
/// use fsjet_glob::PatternSet;
/// use std::path::Path;
///
/// let set = PatternSet::new("/work", ["*.txt", "!secret.txt"]).unwrap();
/// assert!(set.is_match(Path::new("/work/a/notes.txt")));
/// assert!(!set.is_match(Path::new("/work/a/secret.txt")));
/// assert!(!set.is_match(Path::new("/work/a/notes.md")));
/// ```
#[derive(Debug, Clone)]
pub struct PatternSet {
    base: PathBuf,
    patterns: Vec<CompiledPattern>,
    options: MatchOptions,
}

impl PatternSet {
    /// Compile `patterns` relative to `base` with default options.
    pub fn new<I, S>(base: impl AsRef<Path>, patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_options(base, patterns, MatchOptions::default())
    }

    /// Compile `patterns` relative to `base`.
    ///
    /// Fails on an empty pattern (or a lone `!`).
    pub fn with_options<I, S>(
        base: impl AsRef<Path>,
        patterns: I,
        options: MatchOptions,
    ) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = base.as_ref().to_path_buf();
        let base_components = path_components(&base);
        let patterns = patterns
            .into_iter()
            .map(|raw| CompiledPattern::compile(raw.as_ref(), &base_components))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            base,
            patterns,
            options,
        })
    }

    /// The directory anchored patterns are resolved against.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Test a path. Intended for absolute paths; relative paths are compared
    /// as written.
    pub fn is_match(&self, path: &Path) -> bool {
        let components = path_components(path);
        let components: Vec<&str> = components.iter().map(String::as_str).collect();
        let ignore_case = self.options.ignore_case;

        let mut negation_mode = false;
        let mut matched = false;

        for (i, pattern) in self.patterns.iter().enumerate() {
            if pattern.negated {
                if !negation_mode {
                    negation_mode = true;
                    if i == 0 {
                        // Only negations so far: include everything, then reject.
                        matched = true;
                    }
                }
                if matched && pattern.body_matches(&components, ignore_case) {
                    return false;
                }
            } else if !negation_mode && !matched {
                matched = pattern.body_matches(&components, ignore_case);
            }
        }

        matched
    }
}

/// Build a predicate over absolute paths from `patterns` anchored at `base`.
///
/// ```
/// use std::path::Path;
///
/// let is_match = fsjet_glob::create_matcher("/x/y", ["./a.txt"]).unwrap();
/// assert!(is_match(Path::new("/x/y/a.txt")));
/// assert!(!is_match(Path::new("/x/y/b/a.txt")));
/// ```
pub fn create_matcher<I, S>(
    base: impl AsRef<Path>,
    patterns: I,
) -> Result<impl Fn(&Path) -> bool + Send + Sync + 'static, PatternError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let set = PatternSet::new(base, patterns)?;
    Ok(move |path: &Path| set.is_match(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn matches(base: &str, patterns: &[&str], path: &str) -> bool {
        PatternSet::new(base, patterns)
            .unwrap()
            .is_match(Path::new(path))
    }

    #[rstest]
    #[case::basename_anywhere("*.txt", "/b/x/y/z/file.txt", true)]
    #[case::basename_rejects_other_ext("*.txt", "/b/file.md", false)]
    #[case::anchored_one_level("a/*.txt", "/b/a/file.txt", true)]
    #[case::anchored_not_deeper("a/*.txt", "/b/a/c/file.txt", false)]
    #[case::anchored_not_elsewhere("a/*.txt", "/b/c/a/file.txt", false)]
    #[case::dot_slash("./a.txt", "/b/a.txt", true)]
    #[case::dot_slash_not_nested("./a.txt", "/b/c/a.txt", false)]
    #[case::globstar_under_base("a/**/*.rs", "/b/a/x/y/m.rs", true)]
    #[case::globstar_zero_dirs("a/**/*.rs", "/b/a/m.rs", true)]
    #[case::parent_dir("../c/*.txt", "/c/f.txt", true)]
    #[case::rooted("/elsewhere/*.log", "/elsewhere/app.log", true)]
    #[case::rooted_ignores_base("/elsewhere/*.log", "/b/elsewhere/app.log", false)]
    #[case::dotfile_by_star("*", "/b/.env", true)]
    #[case::dotfile_explicit(".*", "/b/.env", true)]
    #[case::hash_is_literal("#x", "/b/#x", true)]
    #[case::brace_across_slash("{a,c/d}/*.txt", "/b/c/d/f.txt", true)]
    #[case::extglob_basename("@(x|y).txt", "/b/q/y.txt", true)]
    fn single_pattern(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
        assert_eq!(matches("/b", &[pattern], path), expected, "{pattern} vs {path}");
    }

    #[test]
    fn anchoring_under_deep_base() {
        assert!(matches("/x/y/dir", &["a/*.txt"], "/x/y/dir/a/file.txt"));
        assert!(!matches("/x/y/dir", &["a/*.txt"], "/x/y/dir/a/b/file.txt"));
        assert!(matches("/x/y", &["./a.txt"], "/x/y/a.txt"));
        assert!(!matches("/x/y", &["./a.txt"], "/x/y/b/a.txt"));
    }

    #[test]
    fn negation_revokes_earlier_match() {
        let patterns = ["**", "!x", "!dir/a/y", "!./dir/a/z"];
        assert!(matches("/t", &patterns, "/t/dir/a/b"));
        assert!(!matches("/t", &patterns, "/t/dir/a/x"));
        assert!(!matches("/t", &patterns, "/t/dir/a/y"));
        assert!(!matches("/t", &patterns, "/t/dir/a/z"));
    }

    #[test]
    fn leading_negation_is_deny_list() {
        let patterns = ["!*.log", "!tmp/**"];
        assert!(matches("/t", &patterns, "/t/src/main.rs"));
        assert!(!matches("/t", &patterns, "/t/src/debug.log"));
        assert!(!matches("/t", &patterns, "/t/tmp/a/b"));
        assert!(!matches("/t", &patterns, "/t/tmp"));
    }

    #[test]
    fn negation_does_not_include_on_its_own() {
        // "!b.txt" comes after a positive pattern, so it cannot add b.md.
        let patterns = ["*.txt", "!b.txt"];
        assert!(matches("/t", &patterns, "/t/a.txt"));
        assert!(!matches("/t", &patterns, "/t/b.txt"));
        assert!(!matches("/t", &patterns, "/t/b.md"));
    }

    #[test]
    fn positives_after_negation_are_not_consulted() {
        let patterns = ["*.txt", "!a.txt", "*.md"];
        assert!(!matches("/t", &patterns, "/t/readme.md"));
        assert!(matches("/t", &patterns, "/t/b.txt"));
    }

    #[test]
    fn ignore_case_option() {
        let set = PatternSet::with_options("/t", ["*.TXT"], MatchOptions { ignore_case: true })
            .unwrap();
        assert!(set.is_match(Path::new("/t/a.txt")));
        assert!(!matches("/t", &["*.TXT"], "/t/a.txt"));
    }

    #[test]
    fn empty_patterns_rejected() {
        assert_eq!(PatternSet::new("/t", [""]).unwrap_err(), PatternError::Empty);
        assert_eq!(PatternSet::new("/t", ["!"]).unwrap_err(), PatternError::Empty);
    }

    #[test]
    fn empty_set_matches_nothing() {
        let set = PatternSet::new("/t", Vec::<String>::new()).unwrap();
        assert!(set.is_empty());
        assert!(!set.is_match(Path::new("/t/a")));
    }

    #[test]
    fn matcher_closure() {
        let is_match = create_matcher("/t", ["*.rs"]).unwrap();
        assert!(is_match(Path::new("/t/src/lib.rs")));
        assert!(!is_match(Path::new("/t/Cargo.toml")));
    }
}
