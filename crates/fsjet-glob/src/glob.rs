//! Glob pattern matching for single path components.
//!
//! Implements shell-style glob patterns:
//! - `*` matches zero or more characters (never a `/`)
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]` match any character in the set or range
//! - `[!abc]` or `[^abc]` match any character NOT in the set
//! - `{a,b,c}` and `{1..3}` brace expansion (expanded before matching)
//! - `@(a|b)`, `?(a|b)`, `+(a|b)`, `*(a|b)` extglob groups: exactly one,
//!   zero or one, one or more, zero or more of the alternatives
//! - `\x` matches `x` literally
//!
//! Leading dots get no special treatment: `*` matches `.hidden`.
//! Unterminated `[` and `(` are taken literally.

use std::cell::Cell;

/// Maximum number of recursive calls for glob matching. Protects against
/// adversarial patterns like `*a*a*a*...*a` that cause O(n^k) backtracking.
/// Counted as total work (calls), not stack depth, to bound actual CPU cost.
const MAX_MATCH_CALLS: usize = 100_000;

/// Upper bound on the number of patterns a single brace expansion may produce.
/// Larger expansions (`{1..1000000}`) keep the brace group literal.
const MAX_BRACE_EXPANSION: usize = 4_096;

/// Check if a string contains glob metacharacters.
pub(crate) fn contains_glob(s: &str) -> bool {
    s.contains(['*', '?', '[', '{', '('])
}

/// Expand brace expressions in a pattern.
///
/// `{a,b,c}` expands to multiple patterns and `{1..3}` / `{a..c}` to
/// sequences. Supports nested braces. Returns a vector of all expanded
/// patterns; a pattern without braces comes back unchanged.
///
/// `f{1..3}` gives `f1`, `f2`, `f3`; `{a,{b,c}}` gives `a`, `b`, `c`.
pub(crate) fn expand_braces(pattern: &str) -> Vec<String> {
    let mut out = Vec::new();
    expand_into(pattern, &mut out);
    if out.len() > MAX_BRACE_EXPANSION {
        return vec![pattern.to_string()];
    }
    out
}

fn expand_into(pattern: &str, out: &mut Vec<String>) {
    if out.len() > MAX_BRACE_EXPANSION {
        return;
    }

    let chars: Vec<char> = pattern.chars().collect();

    // Find the first top-level brace group
    let mut depth = 0usize;
    let mut brace_start = None;
    let mut brace_end = None;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '{' => {
                if depth == 0 {
                    brace_start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    brace_end = Some(i);
                    break;
                }
            }
            _ => {}
        }
        i += 1;
    }

    // No braces found - return pattern as-is
    let (start, end) = match (brace_start, brace_end) {
        (Some(s), Some(e)) => (s, e),
        _ => {
            out.push(pattern.to_string());
            return;
        }
    };

    let prefix: String = chars[..start].iter().collect();
    let suffix: String = chars[end + 1..].iter().collect();
    let content: String = chars[start + 1..end].iter().collect();

    let alternatives =
        expand_sequence(&content).unwrap_or_else(|| split_brace_alternatives(&content));

    for alt in alternatives {
        // Recursively expand in case there are more braces
        expand_into(&format!("{prefix}{alt}{suffix}"), out);
    }
}

/// Expand `1..5`, `5..1` or `a..e` brace content into its members.
fn expand_sequence(content: &str) -> Option<Vec<String>> {
    let (lo, hi) = content.split_once("..")?;

    if let (Ok(lo), Ok(hi)) = (lo.parse::<i64>(), hi.parse::<i64>()) {
        if lo.abs_diff(hi) >= MAX_BRACE_EXPANSION as u64 {
            // Keep the group, escaped so it is neither re-expanded nor lost.
            return Some(vec![format!("\\{{{content}\\}}")]);
        }
        let seq: Vec<String> = if lo <= hi {
            (lo..=hi).map(|n| n.to_string()).collect()
        } else {
            (hi..=lo).rev().map(|n| n.to_string()).collect()
        };
        return Some(seq);
    }

    let mut lo_chars = lo.chars();
    let mut hi_chars = hi.chars();
    match (lo_chars.next(), lo_chars.next(), hi_chars.next(), hi_chars.next()) {
        (Some(a), None, Some(b), None) if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => {
            let seq: Vec<String> = if a <= b {
                (a..=b).map(String::from).collect()
            } else {
                (b..=a).rev().map(String::from).collect()
            };
            Some(seq)
        }
        _ => None,
    }
}

/// Split brace content by commas, respecting nested braces.
fn split_brace_alternatives(content: &str) -> Vec<String> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut escaped = false;

    for c in content.chars() {
        if escaped {
            escaped = false;
            current.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                current.push(c);
            }
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => alternatives.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    // Don't forget the last alternative
    alternatives.push(current);

    alternatives
}

/// A compiled glob for one path component. Braces must already be expanded.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Glob {
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(char),
    /// `?`
    Any,
    /// `*`, any run of characters
    Star,
    Class(CharClass),
    Group(Group),
}

#[derive(Debug, Clone, PartialEq)]
struct CharClass {
    negated: bool,
    items: Vec<ClassItem>,
}

#[derive(Debug, Clone, PartialEq)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    /// `@(...)`
    ExactlyOne,
    /// `?(...)`
    ZeroOrOne,
    /// `+(...)`
    OneOrMore,
    /// `*(...)`
    ZeroOrMore,
}

#[derive(Debug, Clone, PartialEq)]
struct Group {
    kind: GroupKind,
    alternatives: Vec<Vec<Token>>,
}

impl Glob {
    /// Compile a single-component pattern. Never fails: constructs that do
    /// not parse are matched literally.
    pub(crate) fn new(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        Self {
            tokens: parse_tokens(&chars),
        }
    }

    /// Returns the literal text if the pattern has no wildcards at all.
    pub(crate) fn as_literal(&self) -> Option<String> {
        self.tokens
            .iter()
            .map(|t| match t {
                Token::Literal(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Match the entire input.
    pub(crate) fn is_match(&self, input: &str, ignore_case: bool) -> bool {
        let chars: Vec<char> = input.chars().collect();
        let matcher = Matcher {
            input: &chars,
            ignore_case,
            calls: Cell::new(0),
        };
        let len = chars.len();
        matcher.seq(&self.tokens, 0, &mut |end| end == len)
    }
}

fn parse_tokens(chars: &[char]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // Extglob group: one of @?+* immediately followed by '('
        if matches!(c, '@' | '?' | '+' | '*')
            && chars.get(i + 1) == Some(&'(')
            && let Some(close) = find_group_close(chars, i + 1)
        {
            let kind = match c {
                '@' => GroupKind::ExactlyOne,
                '?' => GroupKind::ZeroOrOne,
                '+' => GroupKind::OneOrMore,
                _ => GroupKind::ZeroOrMore,
            };
            let alternatives = split_group_alternatives(&chars[i + 2..close])
                .into_iter()
                .map(parse_tokens)
                .collect();
            tokens.push(Token::Group(Group { kind, alternatives }));
            i = close + 1;
            continue;
        }

        match c {
            '*' => {
                // Consecutive stars collapse to one
                if tokens.last() != Some(&Token::Star) {
                    tokens.push(Token::Star);
                }
            }
            '?' => tokens.push(Token::Any),
            '[' => match parse_char_class(&chars[i..]) {
                Some((class, consumed)) => {
                    tokens.push(Token::Class(class));
                    i += consumed;
                    continue;
                }
                None => tokens.push(Token::Literal('[')),
            },
            // Escape next character
            '\\' if i + 1 < chars.len() => {
                tokens.push(Token::Literal(chars[i + 1]));
                i += 2;
                continue;
            }
            c => tokens.push(Token::Literal(c)),
        }
        i += 1;
    }

    tokens
}

/// Index of the `)` closing the group opened at `open`, if any.
fn find_group_close(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split group content by `|`, respecting nested groups.
fn split_group_alternatives(content: &[char]) -> Vec<&[char]> {
    let mut alternatives = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < content.len() {
        match content[i] {
            '\\' => i += 1,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => {
                alternatives.push(&content[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    alternatives.push(&content[start.min(content.len())..]);
    alternatives
}

/// Parse a character class `[...]`.
///
/// Returns the class and how many pattern chars it spans, or `None` when the
/// bracket is never closed (the caller then treats `[` literally).
fn parse_char_class(pattern: &[char]) -> Option<(CharClass, usize)> {
    let mut idx = 1;
    let mut negated = false;

    // Check for negation
    if idx < pattern.len() && (pattern[idx] == '!' || pattern[idx] == '^') {
        negated = true;
        idx += 1;
    }

    // Special case: ] as first char is literal
    let first_char = idx;
    let mut items = Vec::new();

    while idx < pattern.len() {
        let c = pattern[idx];

        // End of character class
        if c == ']' && idx > first_char {
            return Some((CharClass { negated, items }, idx + 1));
        }

        // Range a-z
        if idx + 2 < pattern.len() && pattern[idx + 1] == '-' && pattern[idx + 2] != ']' {
            items.push(ClassItem::Range(c, pattern[idx + 2]));
            idx += 3;
            continue;
        }

        items.push(ClassItem::Char(c));
        idx += 1;
    }

    None
}

impl CharClass {
    fn matches(&self, ch: char, ignore_case: bool) -> bool {
        let hit = |c: char| {
            self.items.iter().any(|item| match *item {
                ClassItem::Char(x) => x == c,
                ClassItem::Range(lo, hi) => lo <= c && c <= hi,
            })
        };

        let mut matched = hit(ch);
        if !matched && ignore_case {
            matched = ch.to_lowercase().any(hit) || ch.to_uppercase().any(hit);
        }
        matched != self.negated
    }
}

/// Continuation-passing matcher over one input string.
///
/// Every `seq` call reports each position where the tokens can stop to the
/// continuation `k`; the overall match succeeds if any continuation accepts.
struct Matcher<'a> {
    input: &'a [char],
    ignore_case: bool,
    calls: Cell<usize>,
}

impl Matcher<'_> {
    fn charge(&self) -> bool {
        let count = self.calls.get() + 1;
        self.calls.set(count);
        count <= MAX_MATCH_CALLS
    }

    fn char_eq(&self, a: char, b: char) -> bool {
        a == b || (self.ignore_case && a.to_lowercase().eq(b.to_lowercase()))
    }

    fn seq(&self, tokens: &[Token], pos: usize, k: &mut dyn FnMut(usize) -> bool) -> bool {
        if !self.charge() {
            return false;
        }

        let Some((first, rest)) = tokens.split_first() else {
            return k(pos);
        };

        match first {
            Token::Literal(c) => {
                pos < self.input.len()
                    && self.char_eq(self.input[pos], *c)
                    && self.seq(rest, pos + 1, k)
            }
            Token::Any => pos < self.input.len() && self.seq(rest, pos + 1, k),
            Token::Class(class) => {
                pos < self.input.len()
                    && class.matches(self.input[pos], self.ignore_case)
                    && self.seq(rest, pos + 1, k)
            }
            Token::Star => {
                // Try matching star with 0, 1, 2, ... characters, up to a separator
                let mut end = pos;
                loop {
                    if self.seq(rest, end, &mut *k) {
                        return true;
                    }
                    if end >= self.input.len() || self.input[end] == '/' {
                        return false;
                    }
                    end += 1;
                }
            }
            Token::Group(group) => self.group(group, rest, pos, k),
        }
    }

    fn group(
        &self,
        group: &Group,
        rest: &[Token],
        pos: usize,
        k: &mut dyn FnMut(usize) -> bool,
    ) -> bool {
        let mut then = |end: usize| self.seq(rest, end, &mut *k);
        match group.kind {
            GroupKind::ExactlyOne => self.alternatives(&group.alternatives, pos, &mut then),
            GroupKind::ZeroOrOne => {
                then(pos) || self.alternatives(&group.alternatives, pos, &mut then)
            }
            GroupKind::OneOrMore => self.repeat(&group.alternatives, pos, &mut then),
            GroupKind::ZeroOrMore => then(pos) || self.repeat(&group.alternatives, pos, &mut then),
        }
    }

    fn alternatives(
        &self,
        alternatives: &[Vec<Token>],
        pos: usize,
        k: &mut dyn FnMut(usize) -> bool,
    ) -> bool {
        for alt in alternatives {
            if self.seq(alt, pos, &mut *k) {
                return true;
            }
        }
        false
    }

    /// One occurrence of the group, then either stop or go again. Further
    /// rounds require progress so empty alternatives cannot loop.
    fn repeat(
        &self,
        alternatives: &[Vec<Token>],
        pos: usize,
        k: &mut dyn FnMut(usize) -> bool,
    ) -> bool {
        let mut again =
            |end: usize| k(end) || (end > pos && self.repeat(alternatives, end, &mut *k));
        self.alternatives(alternatives, pos, &mut again)
    }
}
