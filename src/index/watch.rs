//! Tail-follow: periodic re-scan of newly appended bytes.
//!
//! Each tick re-scans from the start of the last line seen. That line is
//! delivered again by the scanner and skipped if unchanged; anything else is new.
//! A line that was still being written on the previous tick therefore shows up
//! with a larger length at the same position, and the document reconciles it.

use crate::diagnostics::Diagnostics;
use crate::error::{LinescopeError, Result};
use crate::index::record::{LineBatch, LineRecord};
use crate::scan::{CancelFlags, LineScanner, ScanOptions, ScanOutcome};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Exists only while tail-follow is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchState {
    pub file_path: PathBuf,
    pub last_known_line: LineRecord,
    pub poll_interval: Duration,
}

#[derive(Debug)]
pub struct WatchEngine {
    block_size: usize,
    notify_per_line: usize,
    state: Option<WatchState>,
}

impl WatchEngine {
    pub fn new(block_size: usize, notify_per_line: usize) -> Self {
        Self {
            block_size,
            notify_per_line: notify_per_line.max(1),
            state: None,
        }
    }

    /// Start following `path`. Replaces any watch already running.
    pub fn enable(&mut self, path: &Path, last_known_line: LineRecord, poll_interval: Duration) {
        if self.state.is_some() {
            self.disable();
        }
        self.state = Some(WatchState {
            file_path: path.to_path_buf(),
            last_known_line,
            poll_interval,
        });
    }

    pub fn disable(&mut self) {
        self.state = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&WatchState> {
        self.state.as_ref()
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.state.as_ref().map(|s| s.poll_interval)
    }

    /// Run one poll. Emits only records not seen before; does nothing when disabled.
    ///
    /// A poll that stops early resumes from the last record it emitted, so the
    /// records of a batch it never flushed are scanned again next time.
    ///
    /// # Errors
    /// * `UnableToOpenFile` if the watched file is missing or unreadable
    pub fn tick(
        &mut self,
        flags: &CancelFlags,
        diagnostics: &Diagnostics,
        emit: &mut dyn FnMut(LineBatch),
    ) -> Result<ScanOutcome> {
        let block_size = self.block_size;
        let notify_per_line = self.notify_per_line;
        let Some(state) = self.state.as_mut() else {
            return Ok(ScanOutcome::RequestCompleted);
        };

        let size = std::fs::metadata(&state.file_path)
            .map_err(|_| LinescopeError::unable_to_open(&state.file_path))?
            .len();
        if size < state.last_known_line.end() {
            diagnostics.info(format_args!(
                "{} shrank to {size} bytes, following from the start",
                state.file_path.display()
            ));
            state.last_known_line = LineRecord::EMPTY;
        }

        let options = ScanOptions::new(block_size).starting_at(state.last_known_line.position);
        let mut scanner = LineScanner::open(&state.file_path, options, flags, diagnostics)?;
        let mut batch = Vec::new();
        let mut cursor = state.last_known_line;
        let mut emitted = cursor;

        for line in scanner.by_ref() {
            let record = LineRecord::from(&line);
            if record.length > 0 && record != cursor {
                batch.push(record);
            }
            cursor = record;

            let full = !line.is_last && batch.len() >= notify_per_line;
            if full || (line.is_last && !batch.is_empty()) {
                emit(LineBatch {
                    records: std::mem::take(&mut batch),
                    completed: line.is_last,
                });
                emitted = cursor;
            }
        }

        let outcome = scanner.finish();
        state.last_known_line = if outcome.is_completed() {
            cursor
        } else {
            emitted
        };
        Ok(outcome)
    }
}
