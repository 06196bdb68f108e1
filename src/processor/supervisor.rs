//! Ownership of the processing worker thread.

use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{LinescopeError, Result};
use crate::index::{LineRecord, WatchEngine};
use crate::processor::protocol::{ProcessorCommand, ProcessorEvent};
use crate::processor::worker::processor_worker_loop;
use crate::scan::{CancelFlags, ProgressTracker};
use parking_lot::{Condvar, Mutex};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};

/// How often `interrupt()` re-checks that the worker is still alive while waiting.
const IDLE_RECHECK: Duration = Duration::from_millis(50);

/// What happened to a dispatch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Queued for the worker
    Accepted,
    /// Another operation is in flight; nothing was queued
    Rejected,
    /// Nothing needed doing
    Skipped,
}

/// State shared between the supervisor and its worker.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub(crate) flags: CancelFlags,
    pub(crate) progress: ProgressTracker,
    busy: Mutex<bool>,
    idle: Condvar,
    watch_enabled: AtomicBool,
}

impl SharedState {
    fn try_claim(&self) -> bool {
        let mut busy = self.busy.lock();
        if *busy {
            return false;
        }
        *busy = true;
        true
    }

    fn is_busy(&self) -> bool {
        *self.busy.lock()
    }

    /// Run `last_words` while still holding the claim, then release it.
    ///
    /// Anyone who sees the worker idle is guaranteed to also see whatever
    /// `last_words` sent.
    fn release_with(&self, last_words: impl FnOnce()) {
        let mut busy = self.busy.lock();
        last_words();
        *busy = false;
        drop(busy);
        self.idle.notify_all();
    }
}

/// The worker's claim on an operation. Released on drop if not released earlier.
pub(crate) struct BusyGuard<'a> {
    shared: &'a SharedState,
    released: bool,
}

impl<'a> BusyGuard<'a> {
    pub(crate) fn new(shared: &'a SharedState) -> Self {
        Self {
            shared,
            released: false,
        }
    }

    pub(crate) fn release_with(&mut self, last_words: impl FnOnce()) {
        if self.released {
            last_words();
            return;
        }
        self.released = true;
        self.shared.release_with(last_words);
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.release_with(|| {});
    }
}

/// Owns the single background worker of a document.
///
/// Operations (index, search, filter) are single-flight: [`dispatch`](Self::dispatch)
/// claims the worker and rejects while a claim is held. Watch control commands
/// are never rejected.
pub struct ProcessingSupervisor {
    commands: UnboundedSender<ProcessorCommand>,
    shared: Arc<SharedState>,
    worker: Option<JoinHandle<()>>,
    worker_thread: ThreadId,
    diagnostics: Diagnostics,
}

impl ProcessingSupervisor {
    /// Start the worker thread; results are delivered on `events` in production order.
    pub fn spawn(
        config: &EngineConfig,
        diagnostics: Diagnostics,
        events: UnboundedSender<ProcessorEvent>,
    ) -> Result<Self> {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SharedState::default());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| LinescopeError::other(format!("failed to build worker runtime: {e}")))?;

        let worker_shared = Arc::clone(&shared);
        let worker_diagnostics = diagnostics.clone();
        let watch = WatchEngine::new(config.watch_block_size, config.watch_notify_per_line);

        let worker = std::thread::Builder::new()
            .name("linescope-processor".to_string())
            .spawn(move || {
                runtime.block_on(processor_worker_loop(
                    command_rx,
                    events,
                    worker_shared,
                    worker_diagnostics,
                    watch,
                ));
            })
            .map_err(|e| LinescopeError::other(format!("failed to spawn worker thread: {e}")))?;

        let worker_thread = worker.thread().id();
        diagnostics.debug(format_args!("processor created"));

        Ok(Self {
            commands,
            shared,
            worker: Some(worker),
            worker_thread,
            diagnostics,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.shared.is_busy()
    }

    /// Queue a command. Operations are rejected while another one is in flight.
    ///
    /// # Errors
    /// * `WorkerUnavailable` if the worker thread has exited
    pub fn dispatch(&self, command: ProcessorCommand) -> Result<Dispatch> {
        if let Some(operation) = command.operation() {
            if !self.shared.try_claim() {
                self.diagnostics
                    .debug(format_args!("{operation:?} rejected, worker busy"));
                return Ok(Dispatch::Rejected);
            }
            if self.commands.send(command).is_err() {
                self.shared.release_with(|| {});
                return Err(LinescopeError::WorkerUnavailable);
            }
            return Ok(Dispatch::Accepted);
        }

        let watch = match &command {
            ProcessorCommand::EnableWatch { .. } => Some(true),
            ProcessorCommand::DisableWatch => Some(false),
            _ => None,
        };
        self.commands
            .send(command)
            .map_err(|_| LinescopeError::WorkerUnavailable)?;
        if let Some(enabled) = watch {
            self.shared.watch_enabled.store(enabled, Ordering::SeqCst);
        }
        Ok(Dispatch::Accepted)
    }

    pub fn enable_watch(
        &self,
        path: &Path,
        last_known_line: LineRecord,
        poll_interval: Duration,
    ) -> Result<()> {
        self.dispatch(ProcessorCommand::EnableWatch {
            path: path.to_path_buf(),
            last_known_line,
            poll_interval,
        })
        .map(|_| ())
    }

    pub fn disable_watch(&self) -> Result<()> {
        self.dispatch(ProcessorCommand::DisableWatch).map(|_| ())
    }

    pub fn is_watch_enabled(&self) -> bool {
        self.shared.watch_enabled.load(Ordering::SeqCst)
    }

    pub fn current_progress(&self) -> u8 {
        self.shared.progress.get()
    }

    /// Abort the running operation and block until the worker is idle.
    ///
    /// Returns immediately when nothing is running. Must not be called from the
    /// worker thread.
    pub fn interrupt(&self) {
        if std::thread::current().id() == self.worker_thread {
            self.diagnostics
                .warn(format_args!("interrupt() called from the worker thread, ignored"));
            return;
        }

        self.shared.flags.request_interrupt();
        {
            let mut busy = self.shared.busy.lock();
            while *busy {
                let timed_out = self.shared.idle.wait_for(&mut busy, IDLE_RECHECK).timed_out();
                if timed_out && self.worker_exited() {
                    *busy = false;
                }
            }
        }
        self.shared.flags.clear_interrupt();
    }

    fn worker_exited(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// Stop the worker: running scans end within one block, then the thread is joined.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shared.flags.request_shutdown();
        let _ = self.commands.send(ProcessorCommand::Shutdown);
        self.diagnostics
            .debug(format_args!("finishing worker thread"));
        if worker.join().is_err() {
            self.diagnostics.warn(format_args!("worker thread panicked"));
        }
        self.diagnostics.debug(format_args!("worker thread finished"));
    }
}

impl Drop for ProcessingSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
