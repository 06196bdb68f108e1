//! Block-wise line scanner.
//!
//! [`LineScanner`] reads a file in fixed-size blocks starting at an arbitrary
//! byte offset and yields one [`ScannedLine`] per `\n`-terminated line, plus a
//! final unterminated line if the file does not end with a delimiter. A line
//! that straddles block boundaries is carried over and delivered once.
//!
//! The scanner is a single-pass iterator. It stops early, without yielding any
//! further lines, when the shared [`CancelFlags`] request an interrupt or a
//! shutdown, or when a read fails part way through the file; the reason is
//! available from [`LineScanner::finish`].

use crate::diagnostics::Diagnostics;
use crate::error::{LinescopeError, Result};
use crate::scan::decoder::TextDecoder;
use crate::scan::flags::{CancelFlags, ScanOutcome};
use crate::scan::progress::{percent_of, ProgressSink};
use memchr::memchr;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// The only line delimiter recognised by the scanner.
pub const LINE_DELIMITER: u8 = b'\n';

/// One discovered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedLine {
    /// Byte offset of the first byte of the line
    pub position: u64,

    /// Byte length including the delimiter (none for a final unterminated line)
    pub length: u64,

    /// Line number counted from the scan's start offset
    pub line_number: u64,

    /// Decoded text including the delimiter; `None` unless decoding was requested
    pub text: Option<String>,

    /// True for the last line of the file
    pub is_last: bool,
}

impl ScannedLine {
    /// Byte offset just past the line
    pub fn end(&self) -> u64 {
        self.position + self.length
    }

    /// Decoded text with the line terminator (`\n` or `\r\n`) removed.
    pub fn content(&self) -> &str {
        let text = self.text.as_deref().unwrap_or("");
        match text.strip_suffix('\n') {
            Some(stripped) => stripped.strip_suffix('\r').unwrap_or(stripped),
            None => text,
        }
    }
}

/// Parameters for a single scan.
#[derive(Clone, Copy)]
pub struct ScanOptions<'a> {
    pub block_size: usize,
    pub start_position: u64,
    pub decoder: Option<TextDecoder>,
    pub progress: Option<&'a dyn ProgressSink>,
}

impl<'a> ScanOptions<'a> {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            start_position: 0,
            decoder: None,
            progress: None,
        }
    }

    pub fn starting_at(mut self, position: u64) -> Self {
        self.start_position = position;
        self
    }

    pub fn decode_with(mut self, decoder: TextDecoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn with_progress(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }
}

/// Single-pass iterator over the lines of a file.
pub struct LineScanner<'a> {
    file: File,
    options: ScanOptions<'a>,
    flags: &'a CancelFlags,
    diagnostics: &'a Diagnostics,

    /// Current block and how much of it holds data
    block: Vec<u8>,
    block_len: usize,
    /// File offset of `block[0]`
    block_start: u64,
    /// Index of the first byte of `block` not yet assigned to a line
    cursor: usize,

    /// Bytes of a line that began in an earlier block (kept only when decoding)
    carry: Vec<u8>,

    line_start: u64,
    line_number: u64,
    total_size: u64,
    at_eof: bool,

    /// Next line to hand out, held back until we know whether it is the last one
    lookahead: Option<ScannedLine>,
    outcome: Option<ScanOutcome>,
    read_error: Option<std::io::Error>,
}

impl<'a> LineScanner<'a> {
    /// Open `path` and position the scanner at `options.start_position`.
    ///
    /// # Errors
    /// * `UnableToOpenFile` if the file cannot be opened, sized or seeked
    pub fn open(
        path: &Path,
        options: ScanOptions<'a>,
        flags: &'a CancelFlags,
        diagnostics: &'a Diagnostics,
    ) -> Result<Self> {
        let mut file = File::open(path).map_err(|_| LinescopeError::unable_to_open(path))?;
        let total_size = file
            .metadata()
            .map_err(|_| LinescopeError::unable_to_open(path))?
            .len();
        file.seek(SeekFrom::Start(options.start_position))
            .map_err(|_| LinescopeError::unable_to_open(path))?;

        let block_size = options.block_size.max(1);

        Ok(Self {
            file,
            options,
            flags,
            diagnostics,
            block: vec![0; block_size],
            block_len: 0,
            block_start: options.start_position,
            cursor: 0,
            carry: Vec::new(),
            line_start: options.start_position,
            line_number: 0,
            total_size,
            at_eof: false,
            lookahead: None,
            outcome: None,
            read_error: None,
        })
    }

    /// File size observed when the scan was opened
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Stop reason, if the scanner has stopped on its own
    pub fn outcome(&self) -> Option<ScanOutcome> {
        self.outcome
    }

    /// Final outcome; a consumer that stopped iterating early completed its request.
    pub fn finish(&self) -> ScanOutcome {
        self.outcome.unwrap_or(ScanOutcome::RequestCompleted)
    }

    /// The I/O error behind a [`ScanOutcome::ReadFailed`] stop.
    pub fn take_read_error(&mut self) -> Option<std::io::Error> {
        self.read_error.take()
    }

    /// Decoder applied to line text, if any
    pub fn decoder(&self) -> Option<TextDecoder> {
        self.options.decoder
    }

    fn fill_block(&mut self) {
        self.block_start += self.block_len as u64;
        self.block_len = 0;
        self.cursor = 0;

        while self.block_len < self.block.len() {
            match self.file.read(&mut self.block[self.block_len..]) {
                Ok(0) => {
                    self.at_eof = true;
                    break;
                }
                Ok(n) => self.block_len += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.diagnostics.warn(format_args!(
                        "read failed at byte {}: {e}",
                        self.block_start + self.block_len as u64
                    ));
                    self.read_error = Some(e);
                    self.outcome = Some(ScanOutcome::ReadFailed);
                    return;
                }
            }
        }

        if let Some(sink) = self.options.progress {
            sink.report(percent_of(self.block_start, self.total_size));
        }
    }

    /// Decode the current line's bytes up to `end` (exclusive index into `block`).
    fn decode_through(&mut self, end: usize) -> Option<String> {
        let decoder = self.options.decoder?;
        let tail = &self.block[self.cursor..end];
        if self.carry.is_empty() {
            return Some(decoder.decode(tail));
        }
        self.carry.extend_from_slice(tail);
        let text = decoder.decode(&self.carry);
        self.carry.clear();
        Some(text)
    }

    fn complete_line(&mut self, end_position: u64, text: Option<String>) -> ScannedLine {
        let line = ScannedLine {
            position: self.line_start,
            length: end_position - self.line_start,
            line_number: self.line_number,
            text,
            is_last: false,
        };
        self.line_start = end_position;
        self.line_number += 1;
        line
    }

    /// Find the next line, or record why there is none.
    fn advance(&mut self) -> Option<ScannedLine> {
        if self.outcome.is_some() {
            return None;
        }

        loop {
            if let Some(stop) = self.flags.check() {
                self.outcome = Some(stop);
                return None;
            }

            if self.cursor < self.block_len {
                match memchr(LINE_DELIMITER, &self.block[self.cursor..self.block_len]) {
                    Some(offset) => {
                        let end = self.cursor + offset + 1;
                        let text = self.decode_through(end);
                        let end_position = self.block_start + end as u64;
                        self.cursor = end;
                        return Some(self.complete_line(end_position, text));
                    }
                    None => {
                        if self.options.decoder.is_some() {
                            self.carry
                                .extend_from_slice(&self.block[self.cursor..self.block_len]);
                        }
                        self.cursor = self.block_len;
                        continue;
                    }
                }
            }

            if self.at_eof {
                let end_position = self.block_start + self.block_len as u64;
                if end_position > self.line_start {
                    let text = self.decode_through(self.block_len);
                    return Some(self.complete_line(end_position, text));
                }
                self.outcome = Some(ScanOutcome::RequestCompleted);
                return None;
            }

            self.fill_block();
            if self.outcome.is_some() {
                return None;
            }
        }
    }
}

impl Iterator for LineScanner<'_> {
    type Item = ScannedLine;

    fn next(&mut self) -> Option<ScannedLine> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.advance()?);
        }

        match self.advance() {
            Some(next) => self.lookahead.replace(next),
            None if self.outcome == Some(ScanOutcome::RequestCompleted) => {
                let mut last = self.lookahead.take()?;
                last.is_last = true;
                Some(last)
            }
            None => {
                self.lookahead = None;
                None
            }
        }
    }
}
