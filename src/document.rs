//! Consumer-facing document model.
//!
//! - [`index`] - The [`DocumentIndex`] state machine and batch reconciliation
//! - [`line_cache`] - LRU cache of line bytes
//! - [`rules`] - Stored filter rules
//! - [`notify`] - Notifications for the document's subscriber

pub mod index;
pub mod line_cache;
pub mod notify;
pub mod rules;

pub use index::{DocumentIndex, DocumentState};
pub use line_cache::LineCache;
pub use notify::Notification;
pub use rules::FilterRules;
