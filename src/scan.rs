//! Block-wise line discovery.
//!
//! The scanner walks a file in fixed-size blocks, splits it on `\n`, optionally
//! decodes each line, and hands out line descriptors one at a time. Index
//! building, search, filtering and tail-follow are all built on top of it.

pub mod decoder;
pub mod flags;
pub mod progress;
pub mod scanner;

pub use decoder::TextDecoder;
pub use flags::{CancelFlags, ScanOutcome};
pub use progress::{percent_of, ProgressSink, ProgressTracker};
pub use scanner::{LineScanner, ScanOptions, ScannedLine};
