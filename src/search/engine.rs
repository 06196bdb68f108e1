//! Occurrence search over scanned lines.

use crate::scan::{LineScanner, ScanOutcome};
use crate::search::matcher::LineMatcher;
use crate::search::request::SearchResult;

/// A group of search hits, flushed together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchBatch {
    pub results: Vec<SearchResult>,
    pub completed: bool,
}

/// Applies one matcher to every decoded line and batches the hits.
#[derive(Debug)]
pub struct SearchEngine {
    matcher: LineMatcher,
    notify_per_line: usize,
    /// Stop after this many hits; 0 means unlimited
    max_occurrences: usize,
    /// Source line number of the scan's first line
    first_line: usize,
}

impl SearchEngine {
    pub fn new(matcher: LineMatcher, notify_per_line: usize, max_occurrences: usize) -> Self {
        Self {
            matcher,
            notify_per_line: notify_per_line.max(1),
            max_occurrences,
            first_line: 0,
        }
    }

    /// Report line numbers relative to `first_line` instead of the scan start.
    pub fn starting_at_line(mut self, first_line: usize) -> Self {
        self.first_line = first_line;
        self
    }

    /// Drain `scanner` (which must decode text) and emit hit batches.
    ///
    /// Always ends with a `completed` batch unless the scan was interrupted:
    /// at end of file, or as soon as `max_occurrences` hits were found.
    pub fn run(
        &self,
        scanner: &mut LineScanner<'_>,
        emit: &mut dyn FnMut(SearchBatch),
    ) -> ScanOutcome {
        let decoder = scanner.decoder().unwrap_or_default();
        let mut batch = Vec::new();
        let mut found = 0usize;
        let mut completion_sent = false;

        for line in scanner.by_ref() {
            let content = line.content();
            if let Some((start, length)) = self.matcher.find(content) {
                // Offsets in decoded text, converted back to bytes of the file.
                let file_bytes = |range: std::ops::Range<usize>| {
                    content
                        .get(range.clone())
                        .map_or(range.len(), |text| decoder.encoded_len(text))
                };
                let offset = file_bytes(0..start);
                let match_bytes = file_bytes(start..start + length);
                batch.push(SearchResult {
                    position: line.position + offset as u64,
                    line_number: self.first_line + line.line_number as usize,
                    match_length: u32::try_from(match_bytes).unwrap_or(u32::MAX),
                    line_text: content.to_string(),
                });
                found += 1;

                if self.max_occurrences > 0 && found >= self.max_occurrences {
                    emit(SearchBatch {
                        results: batch,
                        completed: true,
                    });
                    return ScanOutcome::RequestCompleted;
                }
            }

            if line.is_last || batch.len() >= self.notify_per_line {
                emit(SearchBatch {
                    results: std::mem::take(&mut batch),
                    completed: line.is_last,
                });
                completion_sent = line.is_last;
            }
        }

        let outcome = scanner.finish();
        if outcome.is_completed() && !completion_sent {
            emit(SearchBatch {
                results: batch,
                completed: true,
            });
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::scan::{CancelFlags, ScanOptions, TextDecoder};
    use crate::search::request::SearchRequest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn search(
        content: &[u8],
        request: SearchRequest,
        notify: usize,
        max: usize,
    ) -> Vec<SearchBatch> {
        search_decoded(content, request, TextDecoder::default(), notify, max)
    }

    fn search_decoded(
        content: &[u8],
        request: SearchRequest,
        decoder: TextDecoder,
        notify: usize,
        max: usize,
    ) -> Vec<SearchBatch> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();

        let flags = CancelFlags::new();
        let diagnostics = Diagnostics::default();
        let options = ScanOptions::new(4).decode_with(decoder);
        let mut scanner = LineScanner::open(file.path(), options, &flags, &diagnostics).unwrap();
        let engine = SearchEngine::new(request.compile().unwrap(), notify, max);
        let mut batches = Vec::new();
        engine.run(&mut scanner, &mut |b| batches.push(b));
        batches
    }

    #[test]
    fn test_max_occurrences_stops_early() {
        let batches = search(b"abc\ndef\nghi", SearchRequest::literal("bc"), 1000, 1);
        assert_eq!(batches.len(), 1);
        assert!(batches[0].completed);
        assert_eq!(
            batches[0].results,
            vec![SearchResult {
                position: 1,
                line_number: 0,
                match_length: 2,
                line_text: "abc".to_string(),
            }]
        );
    }

    #[test]
    fn test_no_match_still_completes() {
        let batches = search(b"abc\ndef\n", SearchRequest::literal("zzz"), 10, 0);
        assert_eq!(
            batches,
            vec![SearchBatch {
                results: vec![],
                completed: true
            }]
        );
    }

    #[test]
    fn test_regex_hits_batched() {
        let content = b"a1\nb\nc22\nd333\ne\n";
        let batches = search(content, SearchRequest::regex(r"\d+"), 2, 0);
        let hits: Vec<_> = batches
            .iter()
            .flat_map(|b| b.results.iter().map(|r| (r.line_number, r.position, r.match_length)))
            .collect();
        assert_eq!(hits, vec![(0, 1, 1), (2, 6, 2), (3, 10, 3)]);
        assert!(!batches[0].completed);
        assert!(batches.last().unwrap().completed);
        assert_eq!(batches.iter().filter(|b| b.completed).count(), 1);
    }

    #[test]
    fn test_latin1_positions_are_file_offsets() {
        let content = b"x\n\xe9\xe9 bc\n";
        let batches = search_decoded(
            content,
            SearchRequest::literal("bc"),
            TextDecoder::for_label("latin1"),
            10,
            0,
        );
        let hit = &batches[0].results[0];
        assert_eq!(hit.position, 5);
        assert_eq!(hit.match_length, 2);
        assert_eq!(hit.line_text, "\u{e9}\u{e9} bc");
        assert_eq!(&content[5..7], b"bc");
    }

    #[test]
    fn test_multibyte_match_length_in_file_bytes() {
        // "\u{e9}t\u{e9}" is three bytes in latin1 and five once decoded.
        let content = b"l\xe9t\xe9!\n";
        let batches = search_decoded(
            content,
            SearchRequest::regex("\u{e9}t\u{e9}"),
            TextDecoder::for_label("latin1"),
            10,
            0,
        );
        let hit = &batches[0].results[0];
        assert_eq!((hit.position, hit.match_length), (1, 3));
    }

    #[test]
    fn test_utf8_positions_unchanged() {
        let batches = search(b"\xc3\xa9 bc\n", SearchRequest::literal("bc"), 10, 0);
        let hit = &batches[0].results[0];
        assert_eq!((hit.position, hit.match_length), (3, 2));
    }

    #[test]
    fn test_zero_length_regex_is_no_hit() {
        let batches = search(b"abc\nxx\n", SearchRequest::regex("x*"), 10, 0);
        let lines: Vec<_> = batches
            .iter()
            .flat_map(|b| b.results.iter().map(|r| r.line_number))
            .collect();
        assert_eq!(lines, vec![1]);
    }

    #[test]
    fn test_first_line_offset_applies() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"xx\nab\n").unwrap();
        file.flush().unwrap();

        let flags = CancelFlags::new();
        let diagnostics = Diagnostics::default();
        let options = ScanOptions::new(8)
            .starting_at(3)
            .decode_with(TextDecoder::default());
        let mut scanner = LineScanner::open(file.path(), options, &flags, &diagnostics).unwrap();
        let engine = SearchEngine::new(SearchRequest::literal("b").compile().unwrap(), 10, 0)
            .starting_at_line(1);
        let mut batches = Vec::new();
        engine.run(&mut scanner, &mut |b| batches.push(b));
        assert_eq!(batches[0].results[0].line_number, 1);
        assert_eq!(batches[0].results[0].position, 4);
    }
}
