//! Line matching, search and filtering.
//!
//! - [`request`] - Search requests, filter rules and results
//! - [`matcher`] - Compiled literal / regex line matchers
//! - [`engine`] - Occurrence search over scanned lines
//! - [`filter`] - Conjunctive rule filtering and the filtered-line map

pub mod engine;
pub mod filter;
pub mod matcher;
pub mod request;

pub use engine::{SearchBatch, SearchEngine};
pub use filter::{FilterBatch, FilterEngine, FilterMap};
pub use matcher::LineMatcher;
pub use request::{FilterRule, SearchRequest, SearchResult};
