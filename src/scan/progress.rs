//! Percent-complete reporting for long scans.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Receives progress percentages from a scan.
pub trait ProgressSink {
    fn report(&self, percent: u8);
}

/// `floor(100 * position / total)`, clamped to 100. An empty file reports 0.
pub fn percent_of(position: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (u128::from(position) * 100) / u128::from(total);
    percent.min(100) as u8
}

/// Shared current-progress value, readable from any thread.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    current: Arc<AtomicU8>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u8 {
        self.current.load(Ordering::SeqCst)
    }

    /// Store `percent`; returns true only when the value changed.
    pub fn set(&self, percent: u8) -> bool {
        self.current.swap(percent, Ordering::SeqCst) != percent
    }
}
