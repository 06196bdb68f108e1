use crate::diagnostics::Diagnostics;
use crate::error::LinescopeError;
use crate::index::{IndexBuilder, WatchEngine};
use crate::processor::protocol::{Operation, ProcessorCommand, ProcessorEvent};
use crate::processor::supervisor::{BusyGuard, SharedState};
use crate::scan::{
    LineScanner, ProgressSink, ProgressTracker, ScanOptions, ScanOutcome, TextDecoder,
};
use crate::search::{FilterEngine, LineMatcher, SearchEngine};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{interval_at, Interval, MissedTickBehavior};

/// Run the processing worker, handling commands and watch polls until shutdown.
pub(crate) async fn processor_worker_loop(
    mut rx: UnboundedReceiver<ProcessorCommand>,
    events: UnboundedSender<ProcessorEvent>,
    shared: Arc<SharedState>,
    diagnostics: Diagnostics,
    watch: WatchEngine,
) {
    let mut state = WorkerState {
        events,
        shared,
        diagnostics,
        watch,
    };
    let mut ticker: Option<Interval> = None;

    state.diagnostics.debug(format_args!("worker started"));

    loop {
        // Commands first: a queued operation must not be overtaken by a poll.
        let wake = tokio::select! {
            biased;
            command = rx.recv() => Wake::Command(command),
            _ = next_tick(&mut ticker) => Wake::WatchTick,
        };

        let outcome = match wake {
            Wake::Command(Some(command)) => state.handle_command(command),
            Wake::Command(None) => HandlerOutcome::exit(),
            Wake::WatchTick => {
                state.watch_tick();
                HandlerOutcome::proceed()
            }
        };

        match outcome.watch {
            WatchChange::Start(period) => ticker = Some(watch_interval(period)),
            WatchChange::Stop => ticker = None,
            WatchChange::Unchanged => {}
        }

        if outcome.done {
            break;
        }
    }

    state.diagnostics.debug(format_args!("worker stopped"));
}

enum Wake {
    Command(Option<ProcessorCommand>),
    WatchTick,
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn watch_interval(period: Duration) -> Interval {
    let mut interval = interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

enum WatchChange {
    Start(Duration),
    Stop,
    Unchanged,
}

struct HandlerOutcome {
    watch: WatchChange,
    done: bool,
}

impl HandlerOutcome {
    fn proceed() -> Self {
        Self {
            watch: WatchChange::Unchanged,
            done: false,
        }
    }

    fn watch(change: WatchChange) -> Self {
        Self {
            watch: change,
            done: false,
        }
    }

    fn exit() -> Self {
        Self {
            watch: WatchChange::Stop,
            done: true,
        }
    }
}

/// Forwards scanner progress as events, only when the percentage changes.
struct EventProgress<'a> {
    tracker: &'a ProgressTracker,
    events: &'a UnboundedSender<ProcessorEvent>,
}

impl ProgressSink for EventProgress<'_> {
    fn report(&self, percent: u8) {
        if self.tracker.set(percent) {
            let _ = self.events.send(ProcessorEvent::Progress(percent));
        }
    }
}

struct WorkerState {
    events: UnboundedSender<ProcessorEvent>,
    shared: Arc<SharedState>,
    diagnostics: Diagnostics,
    watch: WatchEngine,
}

impl WorkerState {
    fn handle_command(&mut self, command: ProcessorCommand) -> HandlerOutcome {
        match command {
            ProcessorCommand::CreateIndex {
                path,
                notify_per_line,
                block_size,
            } => {
                let mut builder = IndexBuilder::new(notify_per_line);
                let options = ScanOptions::new(block_size);
                self.run_operation(Operation::CreateIndex, &path, options, |scanner, emit| {
                    builder.run(scanner, &mut |batch| emit(ProcessorEvent::IndexBatch(batch)))
                });
                HandlerOutcome::proceed()
            }
            ProcessorCommand::Search {
                path,
                decoder,
                matcher,
                start_position,
                first_line,
                max_occurrences,
                notify_per_line,
                block_size,
            } => {
                self.search(
                    &path,
                    decoder,
                    matcher,
                    start_position,
                    first_line,
                    max_occurrences,
                    notify_per_line,
                    block_size,
                );
                HandlerOutcome::proceed()
            }
            ProcessorCommand::CreateFilter {
                path,
                decoder,
                matchers,
                notify_per_line,
                block_size,
            } => {
                let mut engine = FilterEngine::new(matchers, notify_per_line);
                let options = ScanOptions::new(block_size).decode_with(decoder);
                self.run_operation(Operation::CreateFilter, &path, options, |scanner, emit| {
                    engine.run(scanner, &mut |batch| emit(ProcessorEvent::FilterBatch(batch)))
                });
                HandlerOutcome::proceed()
            }
            ProcessorCommand::EnableWatch {
                path,
                last_known_line,
                poll_interval,
            } => {
                self.diagnostics.debug(format_args!(
                    "watching {} every {} ms",
                    path.display(),
                    poll_interval.as_millis()
                ));
                self.watch.enable(&path, last_known_line, poll_interval);
                HandlerOutcome::watch(WatchChange::Start(poll_interval))
            }
            ProcessorCommand::DisableWatch => {
                self.diagnostics.debug(format_args!("watch disabled"));
                self.watch.disable();
                HandlerOutcome::watch(WatchChange::Stop)
            }
            ProcessorCommand::Shutdown => HandlerOutcome::exit(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        path: &Path,
        decoder: TextDecoder,
        matcher: LineMatcher,
        start_position: u64,
        first_line: usize,
        max_occurrences: usize,
        notify_per_line: usize,
        block_size: usize,
    ) {
        let engine = SearchEngine::new(matcher, notify_per_line, max_occurrences)
            .starting_at_line(first_line);
        let options = ScanOptions::new(block_size)
            .starting_at(start_position)
            .decode_with(decoder);
        self.run_operation(Operation::Search, path, options, |scanner, emit| {
            engine.run(scanner, &mut |batch| emit(ProcessorEvent::SearchBatch(batch)))
        });
    }

    /// Claim-guarded scan shared by every exclusive operation.
    ///
    /// The claim is dropped together with the completion event, so the
    /// consumer never observes a finished operation while the worker still
    /// looks busy.
    fn run_operation<F>(
        &self,
        operation: Operation,
        path: &Path,
        options: ScanOptions<'_>,
        drive: F,
    ) where
        F: FnOnce(&mut LineScanner<'_>, &mut dyn FnMut(ProcessorEvent)) -> ScanOutcome,
    {
        let mut busy = BusyGuard::new(&self.shared);
        let started = Instant::now();
        self.set_progress(0);

        let progress = EventProgress {
            tracker: &self.shared.progress,
            events: &self.events,
        };
        let options = options.with_progress(&progress);

        let mut scanner =
            match LineScanner::open(path, options, &self.shared.flags, &self.diagnostics) {
                Ok(scanner) => scanner,
                Err(error) => {
                    self.diagnostics
                        .debug(format_args!("{operation:?} could not start: {error}"));
                    busy.release_with(|| self.send(ProcessorEvent::Failed { operation, error }));
                    return;
                }
            };

        let outcome = {
            let mut emit = |event: ProcessorEvent| {
                if event.is_completion() {
                    busy.release_with(|| self.send(event));
                } else {
                    self.send(event);
                }
            };
            drive(&mut scanner, &mut emit)
        };

        if outcome == ScanOutcome::ReadFailed {
            let error = match scanner.take_read_error() {
                Some(source) => LinescopeError::file_error(
                    format!("reading {} failed", path.display()),
                    source,
                ),
                None => LinescopeError::other(format!("reading {} failed", path.display())),
            };
            busy.release_with(|| self.send(ProcessorEvent::Failed { operation, error }));
        } else if outcome != ScanOutcome::SystemInterrupted {
            self.set_progress(100);
        }
        self.diagnostics.debug(format_args!(
            "{operation:?} of {} finished ({outcome:?}) in {} ms",
            path.display(),
            started.elapsed().as_millis()
        ));
    }

    fn watch_tick(&mut self) {
        let events = &self.events;
        let result = self.watch.tick(&self.shared.flags, &self.diagnostics, &mut |batch| {
            let _ = events.send(ProcessorEvent::IndexBatch(batch));
        });
        if let Err(error) = result {
            self.diagnostics
                .debug(format_args!("watch poll skipped: {error}"));
        }
    }

    fn set_progress(&self, percent: u8) {
        if self.shared.progress.set(percent) {
            self.send(ProcessorEvent::Progress(percent));
        }
    }

    fn send(&self, event: ProcessorEvent) {
        // The document may already be gone during shutdown.
        let _ = self.events.send(event);
    }
}
