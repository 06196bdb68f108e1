//! Conjunctive line filtering.
//!
//! A line passes when every active rule matches it. Passing lines receive
//! consecutive filtered line numbers, recorded in a [`FilterMap`] that maps
//! source lines to filtered lines and back.

use crate::error::Result;
use crate::scan::{LineScanner, ScanOutcome};
use crate::search::matcher::LineMatcher;
use crate::search::request::FilterRule;
use std::collections::BTreeMap;

/// Source-line <-> filtered-line mapping.
///
/// `forward` and `reverse` are exact inverses, and `forward` is strictly
/// increasing: earlier source lines always get smaller filtered numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterMap {
    forward: BTreeMap<usize, usize>,
    reverse: BTreeMap<usize, usize>,
}

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_line: usize, filtered_line: usize) {
        self.forward.insert(source_line, filtered_line);
        self.reverse.insert(filtered_line, source_line);
    }

    /// Add every entry of `other`. Existing entries are never removed.
    pub fn merge(&mut self, other: FilterMap) {
        self.forward.extend(other.forward);
        self.reverse.extend(other.reverse);
    }

    pub fn forward(&self, source_line: usize) -> Option<usize> {
        self.forward.get(&source_line).copied()
    }

    pub fn reverse(&self, filtered_line: usize) -> Option<usize> {
        self.reverse.get(&filtered_line).copied()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    /// `(source, filtered)` pairs in source order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.forward.iter().map(|(&s, &f)| (s, f))
    }

    pub fn reverse_len(&self) -> usize {
        self.reverse.len()
    }
}

/// A group of newly accepted lines, flushed together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterBatch {
    pub map: FilterMap,
    pub completed: bool,
}

/// Evaluates the AND of the active rules on each decoded line.
#[derive(Debug)]
pub struct FilterEngine {
    matchers: Vec<LineMatcher>,
    notify_per_line: usize,
    filtered_lines: usize,
}

impl FilterEngine {
    pub fn new(matchers: Vec<LineMatcher>, notify_per_line: usize) -> Self {
        Self {
            matchers,
            notify_per_line: notify_per_line.max(1),
            filtered_lines: 0,
        }
    }

    /// Compile the active rules of `rules`; inactive rules are skipped.
    pub fn from_rules(rules: &[FilterRule], notify_per_line: usize) -> Result<Self> {
        let matchers = compile_active(rules)?;
        Ok(Self::new(matchers, notify_per_line))
    }

    /// Short-circuits on the first failing rule. No rules accepts every line.
    pub fn accepts(&self, text: &str) -> bool {
        self.matchers.iter().all(|m| m.is_match(text))
    }

    /// Number of lines accepted so far
    pub fn filtered_lines(&self) -> usize {
        self.filtered_lines
    }

    pub fn run(
        &mut self,
        scanner: &mut LineScanner<'_>,
        emit: &mut dyn FnMut(FilterBatch),
    ) -> ScanOutcome {
        let mut part = FilterMap::new();
        let mut completion_sent = false;

        for line in scanner.by_ref() {
            let accepted = self.accepts(line.content());
            if accepted {
                part.insert(line.line_number as usize, self.filtered_lines);
                self.filtered_lines += 1;
            }

            if line.is_last || (accepted && part.len() >= self.notify_per_line) {
                emit(FilterBatch {
                    map: std::mem::take(&mut part),
                    completed: line.is_last,
                });
                completion_sent = line.is_last;
            }
        }

        let outcome = scanner.finish();
        if outcome.is_completed() && !completion_sent {
            emit(FilterBatch {
                map: part,
                completed: true,
            });
        }
        outcome
    }
}

/// Compile every active rule's request.
pub fn compile_active(rules: &[FilterRule]) -> Result<Vec<LineMatcher>> {
    rules
        .iter()
        .filter(|rule| rule.active)
        .map(|rule| rule.request.compile())
        .collect()
}
