//! Messages exchanged between the document and its processing worker.

use crate::error::LinescopeError;
use crate::index::{LineBatch, LineRecord};
use crate::scan::TextDecoder;
use crate::search::{FilterBatch, LineMatcher, SearchBatch};
use std::path::PathBuf;
use std::time::Duration;

/// Operations that claim the worker exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateIndex,
    Search,
    CreateFilter,
}

/// Commands sent from the document to the worker.
#[derive(Debug)]
pub enum ProcessorCommand {
    CreateIndex {
        path: PathBuf,
        notify_per_line: usize,
        block_size: usize,
    },
    Search {
        path: PathBuf,
        decoder: TextDecoder,
        matcher: LineMatcher,
        start_position: u64,
        /// Source line number of the line at `start_position`
        first_line: usize,
        max_occurrences: usize,
        notify_per_line: usize,
        block_size: usize,
    },
    CreateFilter {
        path: PathBuf,
        decoder: TextDecoder,
        matchers: Vec<LineMatcher>,
        notify_per_line: usize,
        block_size: usize,
    },
    EnableWatch {
        path: PathBuf,
        last_known_line: LineRecord,
        poll_interval: Duration,
    },
    DisableWatch,
    Shutdown,
}

impl ProcessorCommand {
    /// The exclusive operation this command starts, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::CreateIndex { .. } => Some(Operation::CreateIndex),
            Self::Search { .. } => Some(Operation::Search),
            Self::CreateFilter { .. } => Some(Operation::CreateFilter),
            Self::EnableWatch { .. } | Self::DisableWatch | Self::Shutdown => None,
        }
    }
}

/// Results emitted by the worker, in the order they were produced.
#[derive(Debug)]
pub enum ProcessorEvent {
    Progress(u8),
    IndexBatch(LineBatch),
    FilterBatch(FilterBatch),
    SearchBatch(SearchBatch),
    /// The operation could not start, or a read failed part way; it will not complete
    Failed {
        operation: Operation,
        error: LinescopeError,
    },
}

/// Payload-free summary of a [`ProcessorEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Progress(u8),
    Index { completed: bool },
    Filter { completed: bool },
    Search { completed: bool },
    Failed(Operation),
}

impl ProcessorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Progress(percent) => EventKind::Progress(*percent),
            Self::IndexBatch(batch) => EventKind::Index {
                completed: batch.completed,
            },
            Self::FilterBatch(batch) => EventKind::Filter {
                completed: batch.completed,
            },
            Self::SearchBatch(batch) => EventKind::Search {
                completed: batch.completed,
            },
            Self::Failed { operation, .. } => EventKind::Failed(*operation),
        }
    }

    /// True for the last event an operation produces.
    pub fn is_completion(&self) -> bool {
        match self {
            Self::Progress(_) => false,
            Self::IndexBatch(batch) => batch.completed,
            Self::FilterBatch(batch) => batch.completed,
            Self::SearchBatch(batch) => batch.completed,
            Self::Failed { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchBatch;

    #[test]
    fn test_only_exclusive_commands_have_an_operation() {
        let index = ProcessorCommand::CreateIndex {
            path: PathBuf::from("a.log"),
            notify_per_line: 1,
            block_size: 1,
        };
        assert_eq!(index.operation(), Some(Operation::CreateIndex));
        assert_eq!(ProcessorCommand::DisableWatch.operation(), None);
        assert_eq!(ProcessorCommand::Shutdown.operation(), None);
    }

    #[test]
    fn test_completion_events() {
        assert!(!ProcessorEvent::Progress(100).is_completion());
        let partial = ProcessorEvent::SearchBatch(SearchBatch {
            results: vec![],
            completed: false,
        });
        assert!(!partial.is_completion());
        assert_eq!(partial.kind(), EventKind::Search { completed: false });

        let failed = ProcessorEvent::Failed {
            operation: Operation::CreateFilter,
            error: LinescopeError::WorkerUnavailable,
        };
        assert!(failed.is_completion());
        assert_eq!(failed.kind(), EventKind::Failed(Operation::CreateFilter));
    }
}
