//! Cooperative cancellation shared between the supervisor and a running scan.

use std::sync::atomic::{AtomicBool, Ordering};

/// How a scan stopped.
///
/// Only `RequestCompleted` means every line was delivered. Interruptions are
/// not errors; a failed read is surfaced by the worker as a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Reached end of file, or the consumer stopped early on purpose
    RequestCompleted,
    /// A caller asked the running operation to abort
    UserInterrupted,
    /// The engine is being torn down
    SystemInterrupted,
    /// Reading the file failed part way; lines after the failure are missing
    ReadFailed,
}

impl ScanOutcome {
    pub fn is_completed(self) -> bool {
        matches!(self, ScanOutcome::RequestCompleted)
    }
}

/// Shutdown and interrupt flags checked by the scanner.
///
/// Shutdown is sticky. Interrupt clears itself the first time a scan observes it.
#[derive(Debug, Default)]
pub struct CancelFlags {
    shutdown: AtomicBool,
    interrupt: AtomicBool,
}

impl CancelFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn request_interrupt(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
    }

    pub fn clear_interrupt(&self) {
        self.interrupt.store(false, Ordering::SeqCst);
    }

    pub fn is_interrupt_requested(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// Returns the stop reason if the scan must end now, consuming a pending interrupt.
    pub fn check(&self) -> Option<ScanOutcome> {
        if self.is_shutdown() {
            return Some(ScanOutcome::SystemInterrupted);
        }
        if self.interrupt.swap(false, Ordering::SeqCst) {
            return Some(ScanOutcome::UserInterrupted);
        }
        None
    }
}
