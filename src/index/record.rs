//! Line boundary records.

use crate::scan::ScannedLine;

/// Byte span of one source line, delimiter included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LineRecord {
    /// Byte offset of the first byte of the line
    pub position: u64,
    /// Byte length including the trailing `\n`, if any
    pub length: u32,
}

impl LineRecord {
    /// The zero record, used when nothing is known about a file yet
    pub const EMPTY: LineRecord = LineRecord {
        position: 0,
        length: 0,
    };

    pub fn new(position: u64, length: u32) -> Self {
        Self { position, length }
    }

    /// Byte offset just past the line
    pub fn end(&self) -> u64 {
        self.position + u64::from(self.length)
    }

    /// Offset of the line's last byte (its delimiter for terminated lines)
    pub fn last_byte(&self) -> u64 {
        self.end().saturating_sub(1).max(self.position)
    }

    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.position && offset < self.end()
    }
}

impl From<&ScannedLine> for LineRecord {
    fn from(line: &ScannedLine) -> Self {
        Self {
            position: line.position,
            // Lines over 4 GiB are clamped.
            length: u32::try_from(line.length).unwrap_or(u32::MAX),
        }
    }
}

/// A group of new index records, flushed together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineBatch {
    pub records: Vec<LineRecord>,
    /// No further batches follow for this operation
    pub completed: bool,
}
