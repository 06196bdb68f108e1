//! Search requests and their results.

use crate::error::Result;
use crate::search::matcher::LineMatcher;

/// What to look for in each line.
///
/// Two requests are equal when their pattern and mode are equal; the compiled
/// matcher is never part of the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SearchRequest {
    Literal {
        pattern: String,
        case_sensitive: bool,
    },
    Regex {
        pattern: String,
    },
}

impl SearchRequest {
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self::Literal {
            pattern: pattern.into(),
            case_sensitive: true,
        }
    }

    pub fn literal_ignore_case(pattern: impl Into<String>) -> Self {
        Self::Literal {
            pattern: pattern.into(),
            case_sensitive: false,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            Self::Literal { pattern, .. } | Self::Regex { pattern } => pattern,
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex { .. })
    }

    /// Build the matcher for this request.
    ///
    /// # Errors
    /// * `InvalidPattern` for an empty pattern or a regex that fails to compile
    pub fn compile(&self) -> Result<LineMatcher> {
        match self {
            Self::Literal {
                pattern,
                case_sensitive,
            } => LineMatcher::literal(pattern, *case_sensitive),
            Self::Regex { pattern } => LineMatcher::regex(pattern),
        }
    }
}

/// A stored filter rule. Rules compare by request only.
#[derive(Debug, Clone)]
pub struct FilterRule {
    pub request: SearchRequest,
    pub active: bool,
}

impl FilterRule {
    pub fn new(request: SearchRequest, active: bool) -> Self {
        Self { request, active }
    }
}

impl PartialEq for FilterRule {
    fn eq(&self, other: &Self) -> bool {
        self.request == other.request
    }
}

impl Eq for FilterRule {}

/// One matching line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Byte offset of the match (line start plus offset within the decoded line)
    pub position: u64,
    /// Source line number
    pub line_number: usize,
    pub match_length: u32,
    /// Decoded line without its terminator
    pub line_text: String,
}
