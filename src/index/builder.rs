//! Full index construction.

use crate::index::record::{LineBatch, LineRecord};
use crate::scan::{LineScanner, ScanOutcome};

/// Turns scanned lines into batches of [`LineRecord`]s.
#[derive(Debug)]
pub struct IndexBuilder {
    notify_per_line: usize,
    batch: Vec<LineRecord>,
}

impl IndexBuilder {
    pub fn new(notify_per_line: usize) -> Self {
        let notify_per_line = notify_per_line.max(1);
        Self {
            notify_per_line,
            batch: Vec::with_capacity(notify_per_line),
        }
    }

    /// Drain `scanner`, emitting a batch every `notify_per_line` records and a
    /// completed batch at end of file. An interrupted scan emits nothing more.
    pub fn run(
        &mut self,
        scanner: &mut LineScanner<'_>,
        emit: &mut dyn FnMut(LineBatch),
    ) -> ScanOutcome {
        let mut completion_sent = false;

        for line in scanner.by_ref() {
            self.batch.push(LineRecord::from(&line));
            if line.is_last || self.batch.len() >= self.notify_per_line {
                emit(self.take_batch(line.is_last));
                completion_sent = line.is_last;
            }
        }

        let outcome = scanner.finish();
        if outcome.is_completed() {
            if !completion_sent {
                emit(self.take_batch(true));
            }
        } else {
            self.batch.clear();
        }
        outcome
    }

    fn take_batch(&mut self, completed: bool) -> LineBatch {
        LineBatch {
            records: std::mem::replace(&mut self.batch, Vec::with_capacity(self.notify_per_line)),
            completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::scan::{CancelFlags, ScanOptions};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn build(content: &[u8], notify: usize, block: usize) -> (Vec<LineBatch>, ScanOutcome) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();

        let flags = CancelFlags::new();
        let diagnostics = Diagnostics::default();
        let mut scanner =
            LineScanner::open(file.path(), ScanOptions::new(block), &flags, &diagnostics).unwrap();
        let mut batches = Vec::new();
        let outcome = IndexBuilder::new(notify).run(&mut scanner, &mut |b| batches.push(b));
        (batches, outcome)
    }

    #[test]
    fn test_small_file_single_completed_batch() {
        let (batches, outcome) = build(b"abc\ndef\nghi", 1000, 1_000_000);
        assert_eq!(outcome, ScanOutcome::RequestCompleted);
        assert_eq!(batches.len(), 1);
        assert!(batches[0].completed);
        assert_eq!(
            batches[0].records,
            vec![
                LineRecord::new(0, 4),
                LineRecord::new(4, 4),
                LineRecord::new(8, 3)
            ]
        );
    }

    #[test]
    fn test_batches_flush_at_notify_size() {
        let (batches, _) = build(b"1\n2\n3\n4\n5\n", 2, 3);
        let sizes: Vec<_> = batches.iter().map(|b| b.records.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(
            batches.iter().map(|b| b.completed).collect::<Vec<_>>(),
            vec![false, false, true]
        );
    }

    #[test]
    fn test_empty_file_still_completes() {
        let (batches, _) = build(b"", 10, 10);
        assert_eq!(
            batches,
            vec![LineBatch {
                records: vec![],
                completed: true
            }]
        );
    }
}
