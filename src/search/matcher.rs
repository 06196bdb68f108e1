//! Compiled line matchers.
//!
//! Literal patterns use `memchr::memmem` (ASCII case folding when requested);
//! regular expressions use ripgrep's `grep-regex` engine.

use crate::error::{LinescopeError, Result};
use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use memchr::memmem;

/// A first-match finder for a single line of decoded text.
#[derive(Debug, Clone)]
pub enum LineMatcher {
    Literal {
        finder: memmem::Finder<'static>,
        /// Lower-cased needle when matching case-insensitively
        folded: Option<Vec<u8>>,
    },
    Regex(RegexMatcher),
}

impl LineMatcher {
    pub fn literal(pattern: &str, case_sensitive: bool) -> Result<Self> {
        if pattern.is_empty() {
            return Err(LinescopeError::invalid_pattern(pattern, "pattern is empty"));
        }
        let folded = (!case_sensitive).then(|| pattern.as_bytes().to_ascii_lowercase());
        Ok(Self::Literal {
            finder: memmem::Finder::new(pattern.as_bytes()).into_owned(),
            folded,
        })
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(LinescopeError::invalid_pattern(pattern, "pattern is empty"));
        }
        RegexMatcherBuilder::new()
            .build(pattern)
            .map(Self::Regex)
            .map_err(|e| LinescopeError::invalid_pattern(pattern, e.to_string()))
    }

    /// First match in `text` as `(byte offset, byte length)`.
    ///
    /// A regex whose first match is empty (`^`, `x*`) does not match the line.
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        let haystack = text.as_bytes();
        match self {
            Self::Literal {
                finder,
                folded: None,
            } => finder
                .find(haystack)
                .map(|start| (start, finder.needle().len())),
            Self::Literal {
                folded: Some(needle),
                ..
            } => ascii_case_insensitive_find(haystack, needle).map(|start| (start, needle.len())),
            Self::Regex(matcher) => matcher
                .find(haystack)
                .ok()
                .flatten()
                .filter(|m| !m.is_empty())
                .map(|m| (m.start(), m.end() - m.start())),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }
}

/// ASCII case-insensitive substring search; `needle_lower` must be lower-cased.
fn ascii_case_insensitive_find(haystack: &[u8], needle_lower: &[u8]) -> Option<usize> {
    if haystack.len() < needle_lower.len() {
        return None;
    }
    haystack
        .windows(needle_lower.len())
        .position(|window| window.eq_ignore_ascii_case(needle_lower))
}
