//! # linescope - Streaming line indexing for very large text files
//!
//! linescope builds a byte-offset index of every line in a file, then searches,
//! filters and tail-follows it without ever holding the whole file in memory.
//!
//! ## Features
//!
//! - **Block-wise scanning**: Files are read in fixed-size blocks with SIMD newline detection
//! - **Background processing**: One worker thread per document with cooperative cancellation
//! - **Search and filter**: Literal and regex matching powered by ripgrep core libraries
//! - **Tail-follow**: Newly appended lines are picked up incrementally, truncation is detected
//! - **Bounded memory**: Only line offsets are kept; decoded lines live in a small LRU cache
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`scan`] - Block-wise line scanner, decoding, cancellation and progress
//! - [`index`] - Line records, full index building and tail-follow
//! - [`search`] - Matchers, occurrence search and rule filtering
//! - [`processor`] - The background worker and its supervisor
//! - [`document`] - The consumer-facing document and batch reconciliation
//! - [`config`] - Tuning constants, optionally loaded from TOML

// Core modules
pub mod config;
pub mod diagnostics;
pub mod error;

// Scanning engines
pub mod index;
pub mod scan;
pub mod search;

// Processing and document model
pub mod document;
pub mod processor;

// Re-export commonly used types for convenience
pub use config::EngineConfig;
pub use error::{LinescopeError, Result};

// Public API surface for external usage
pub use document::{DocumentIndex, DocumentState, Notification};
pub use index::LineRecord;
pub use processor::{Dispatch, EventKind};
pub use search::{FilterRule, SearchRequest, SearchResult};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
