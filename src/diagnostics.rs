//! Per-document diagnostics context.
//!
//! A `Diagnostics` value is created once for each document and handed to every
//! component that logs, so log lines carry the document label and a stable
//! target without any process-global state.

use std::fmt;
use std::sync::Arc;

/// Log target used by all engine components.
pub const LOG_TARGET: &str = "linescope::engine";

/// Label and log target shared by a document, its supervisor and its worker.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    label: Arc<str>,
    target: &'static str,
}

impl Diagnostics {
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self {
            label: label.into(),
            target: LOG_TARGET,
        }
    }

    pub fn with_target(mut self, target: &'static str) -> Self {
        self.target = target;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        log::debug!(target: self.target, "[{}] {}", self.label, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        log::info!(target: self.target, "[{}] {}", self.label, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        log::warn!(target: self.target, "[{}] {}", self.label, args);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new("linescope")
    }
}
