//! The consumer-facing document: line index, filter map, line cache and the
//! reconciliation of worker batches into them.
//!
//! All state here is owned by the consumer side. The worker only ever produces
//! batches; they are applied when the consumer pumps events with
//! [`DocumentIndex::process_pending`] or [`DocumentIndex::process_next`].

use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::document::line_cache::LineCache;
use crate::document::notify::{Notification, Notifier};
use crate::document::rules::FilterRules;
use crate::error::{LinescopeError, Result};
use crate::index::{LineBatch, LineRecord};
use crate::processor::{
    Dispatch, EventKind, Operation, ProcessingSupervisor, ProcessorCommand, ProcessorEvent,
};
use crate::scan::TextDecoder;
use crate::search::filter::compile_active;
use crate::search::{FilterBatch, FilterMap, FilterRule, SearchBatch, SearchRequest, SearchResult};
use bstr::BString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_stream::wrappers::UnboundedReceiverStream;

const READY_MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Nothing indexed, or the file could not be opened
    Empty,
    /// A full index build is running
    Indexing,
    /// The full index is built; watch, search and filter results may still extend it
    Ready,
}

pub struct DocumentIndex {
    config: EngineConfig,
    diagnostics: Diagnostics,
    path: PathBuf,
    file: Option<File>,
    state: DocumentState,

    lines: Vec<LineRecord>,
    filter_active: bool,
    filter_map: FilterMap,
    cache: LineCache,
    rules: FilterRules,
    search_results: Vec<SearchResult>,

    notifier: Notifier,
    events: UnboundedReceiver<ProcessorEvent>,
    supervisor: ProcessingSupervisor,
}

impl DocumentIndex {
    /// Bind a document to `path` and start its worker. Nothing is read until
    /// [`invalidate`](Self::invalidate) is called.
    pub fn new(path: impl Into<PathBuf>, config: EngineConfig) -> Result<Self> {
        let config = config.validated()?;
        let path = path.into();
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let diagnostics = Diagnostics::new(label);

        let (event_tx, events) = mpsc::unbounded_channel();
        let supervisor = ProcessingSupervisor::spawn(&config, diagnostics.clone(), event_tx)?;
        diagnostics.debug(format_args!("document created for {}", path.display()));

        Ok(Self {
            cache: LineCache::new(config.line_cache_capacity),
            config,
            diagnostics,
            path,
            file: None,
            state: DocumentState::Empty,
            lines: Vec::new(),
            filter_active: false,
            filter_map: FilterMap::new(),
            rules: FilterRules::new(),
            search_results: Vec::new(),
            notifier: Notifier::default(),
            events,
            supervisor,
        })
    }

    /// [`new`](Self::new) with default tuning, then start indexing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut document = Self::new(path, EngineConfig::default())?;
        document.invalidate()?;
        Ok(document)
    }

    /// Receive notifications from now on. A second call replaces the first stream.
    pub fn subscribe(&mut self) -> UnboundedReceiverStream<Notification> {
        self.notifier.subscribe()
    }

    /// Throw away everything known about the file and index it again from offset 0.
    ///
    /// # Errors
    /// * `UnableToOpenFile` if the file cannot be reopened; the document is left `Empty`
    pub fn invalidate(&mut self) -> Result<()> {
        self.notifier.message("Loading file...", None);
        self.notifier.emit(Notification::LayoutChanged);

        self.file = None;
        self.supervisor.interrupt();
        self.process_pending();

        self.filter_active = false;
        self.filter_map.clear();
        self.lines.clear();
        self.cache.clear();

        match File::open(&self.path) {
            Ok(file) => self.file = Some(file),
            Err(_) => {
                self.state = DocumentState::Empty;
                let error = LinescopeError::unable_to_open(&self.path);
                self.notifier.message(error.to_string(), None);
                self.notifier.emit(Notification::LayoutChanged);
                return Err(error);
            }
        }

        self.state = DocumentState::Indexing;
        self.supervisor.dispatch(ProcessorCommand::CreateIndex {
            path: self.path.clone(),
            notify_per_line: self.config.notify_per_line,
            block_size: self.config.block_size,
        })?;
        Ok(())
    }

    /// Search the file for `request`. Ignored while another operation runs.
    ///
    /// Results accumulate in [`search_results`](Self::search_results). The scan
    /// starts at the beginning of the line containing `start_position`.
    ///
    /// # Errors
    /// * `InvalidPattern` if the request does not compile; nothing is dispatched
    pub fn search(
        &mut self,
        request: &SearchRequest,
        encoding: &str,
        store_as_filter_rule: bool,
        start_position: u64,
        max_occurrences: usize,
    ) -> Result<Dispatch> {
        if self.supervisor.is_busy() {
            self.diagnostics
                .debug(format_args!("search for '{}' ignored, busy", request.pattern()));
            return Ok(Dispatch::Rejected);
        }
        let matcher = request.compile()?;

        self.notifier.message("Searching...", None);
        self.search_results.clear();
        if store_as_filter_rule {
            self.rules.append(request.clone(), false);
        }

        let (start_position, first_line) = self.search_origin(start_position);
        self.supervisor.dispatch(ProcessorCommand::Search {
            path: self.path.clone(),
            decoder: TextDecoder::for_label(encoding),
            matcher,
            start_position,
            first_line,
            max_occurrences,
            notify_per_line: self.config.notify_per_line,
            block_size: self.config.block_size,
        })
    }

    /// Build a new filter map from the active rules in `rules`.
    ///
    /// Any running operation is interrupted and the current filter is reset
    /// first. Without active rules the filter simply stays reset.
    ///
    /// # Errors
    /// * `InvalidPattern` if an active rule does not compile; the current filter is kept
    pub fn filter(
        &mut self,
        rules: &[FilterRule],
        encoding: &str,
        activate: bool,
    ) -> Result<Dispatch> {
        let matchers = compile_active(rules)?;

        if self.supervisor.is_busy() {
            self.supervisor.interrupt();
        }
        self.process_pending();
        self.reset_filter();

        if matchers.is_empty() {
            return Ok(Dispatch::Skipped);
        }

        self.notifier.message("Applying selected filter...", None);
        let dispatch = self.supervisor.dispatch(ProcessorCommand::CreateFilter {
            path: self.path.clone(),
            decoder: TextDecoder::for_label(encoding),
            matchers,
            notify_per_line: self.config.notify_per_line,
            block_size: self.config.block_size,
        })?;
        if dispatch == Dispatch::Accepted {
            self.set_filter_enabled(activate);
        }
        Ok(dispatch)
    }

    /// Run [`filter`](Self::filter) over the stored rule list.
    pub fn apply_filter_rules(&mut self, encoding: &str, activate: bool) -> Result<Dispatch> {
        let rules = self.rules.as_slice().to_vec();
        self.filter(&rules, encoding, activate)
    }

    /// Turn tail-follow on or off. Following starts after the last indexed line.
    pub fn set_auto_refresh(&mut self, enabled: bool) -> Result<()> {
        if enabled == self.auto_refresh() {
            return Ok(());
        }
        if enabled {
            let last = self.lines.last().copied().unwrap_or(LineRecord::EMPTY);
            self.supervisor
                .enable_watch(&self.path, last, self.config.watch_poll_interval())?;
            self.notifier.message("Auto refresh enabled", None);
        } else {
            self.supervisor.disable_watch()?;
            self.notifier.message("Auto refresh disabled", None);
        }
        Ok(())
    }

    pub fn auto_refresh(&self) -> bool {
        self.supervisor.is_watch_enabled()
    }

    pub fn is_busy(&self) -> bool {
        self.supervisor.is_busy()
    }

    /// Abort the running operation, if any, and wait until the worker is idle.
    pub fn interrupt(&self) {
        self.supervisor.interrupt();
    }

    // ---- event pump ----

    /// Apply every event already delivered by the worker; returns how many.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next worker event and apply it.
    ///
    /// Returns `None` once the worker has shut down.
    pub async fn process_next(&mut self) -> Option<EventKind> {
        let event = self.events.recv().await?;
        let kind = event.kind();
        self.handle_event(event);
        Some(kind)
    }

    /// Apply events until one satisfies `done`. Returns false if the worker went away first.
    pub async fn process_until(&mut self, mut done: impl FnMut(EventKind) -> bool) -> bool {
        while let Some(kind) = self.process_next().await {
            if done(kind) {
                return true;
            }
        }
        false
    }

    /// Apply one worker event to the document state.
    pub fn handle_event(&mut self, event: ProcessorEvent) {
        match event {
            ProcessorEvent::Progress(percent) => {
                self.notifier.emit(Notification::ProgressChanged(percent))
            }
            ProcessorEvent::IndexBatch(batch) => self.apply_index_batch(batch),
            ProcessorEvent::FilterBatch(batch) => self.apply_filter_batch(batch),
            ProcessorEvent::SearchBatch(batch) => self.apply_search_batch(batch),
            ProcessorEvent::Failed { operation, error } => {
                self.diagnostics
                    .debug(format_args!("{operation:?} failed: {error}"));
                if operation == Operation::CreateIndex {
                    self.state = DocumentState::Empty;
                }
                self.notifier.message(error.to_string(), None);
            }
        }
    }

    /// Merge an index batch, replacing any suffix it supersedes.
    pub fn apply_index_batch(&mut self, batch: LineBatch) {
        let LineBatch {
            mut records,
            completed,
        } = batch;

        if records.first().is_some() && records.first() == self.lines.last() {
            records.remove(0);
        }

        if let (Some(first), Some(last)) = (records.first().copied(), self.lines.last().copied()) {
            if first.position <= last.position {
                let cut = self.lines.partition_point(|r| r.position < first.position);
                let evicted = self.cache.invalidate_from(cut);
                self.diagnostics.debug(format_args!(
                    "batch at {} supersedes {} lines ({evicted} cached)",
                    first.position,
                    self.lines.len() - cut
                ));
                self.lines.truncate(cut);
            }
        }

        if !records.is_empty() {
            self.lines.extend(records);
            self.notifier.emit(Notification::LayoutChanged);
        }
        self.notifier
            .emit(Notification::IndexBatchReady { completed });

        if completed && self.state == DocumentState::Indexing {
            self.state = DocumentState::Ready;
            self.diagnostics
                .debug(format_args!("index ready, {} lines", self.lines.len()));
            self.notifier
                .message("Document ready", Some(READY_MESSAGE_TIMEOUT));
        }
    }

    fn apply_filter_batch(&mut self, batch: FilterBatch) {
        self.filter_map.merge(batch.map);
        self.notifier.emit(Notification::LayoutChanged);
        self.notifier.emit(Notification::FilterBatchReady {
            completed: batch.completed,
        });
        if batch.completed {
            self.notifier.message(
                format!("Filter ready, {} lines found", self.filter_map.len()),
                None,
            );
        }
    }

    fn apply_search_batch(&mut self, batch: SearchBatch) {
        self.search_results.extend(batch.results);
        self.notifier.emit(Notification::SearchBatchReady {
            completed: batch.completed,
        });
        if batch.completed {
            self.notifier.message(
                format!("Search completed, {} results found", self.search_results.len()),
                None,
            );
        }
    }

    // ---- filter state ----

    pub fn set_filter_enabled(&mut self, enabled: bool) {
        if self.filter_active != enabled {
            self.filter_active = enabled;
            self.notifier.emit(Notification::LayoutChanged);
        }
    }

    pub fn is_filter_enabled(&self) -> bool {
        self.filter_active
    }

    /// Drop the filter map and show every line again.
    pub fn reset_filter(&mut self) {
        self.filter_active = false;
        self.filter_map.clear();
        self.notifier.emit(Notification::LayoutChanged);
    }

    pub fn filter_map(&self) -> &FilterMap {
        &self.filter_map
    }

    pub fn filter_rules(&self) -> &FilterRules {
        &self.rules
    }

    pub fn append_filter_rule(&mut self, request: SearchRequest, active: bool) -> bool {
        self.rules.append(request, active)
    }

    pub fn remove_filter_rule(&mut self, request: &SearchRequest) -> Option<FilterRule> {
        self.rules.remove(request)
    }

    pub fn set_filter_rule_enabled(&mut self, request: &SearchRequest, enabled: bool) -> bool {
        self.rules.set_enabled(request, enabled).is_some()
    }

    /// Flip a stored rule; returns its new state.
    pub fn toggle_filter_rule(&mut self, request: &SearchRequest) -> Option<bool> {
        self.rules.toggle(request).map(|rule| rule.active)
    }

    pub fn search_results(&self) -> &[SearchResult] {
        &self.search_results
    }

    // ---- coordinates ----

    /// Visible lines: filtered lines when a filter is active, else all lines.
    pub fn logical_lines_count(&self) -> usize {
        if self.filter_active {
            self.filter_map.len()
        } else {
            self.lines.len()
        }
    }

    pub fn source_lines_count(&self) -> usize {
        self.lines.len()
    }

    /// The full line index in source order
    pub fn line_records(&self) -> &[LineRecord] {
        &self.lines
    }

    /// `None` when the source line is hidden by the active filter.
    pub fn source_to_logical(&self, source_line: usize) -> Option<usize> {
        if self.filter_active {
            self.filter_map.forward(source_line)
        } else {
            Some(source_line)
        }
    }

    pub fn logical_to_source(&self, logical_line: usize) -> Option<usize> {
        if self.filter_active {
            self.filter_map.reverse(logical_line)
        } else {
            Some(logical_line)
        }
    }

    fn record(&self, logical_line: usize) -> Option<(usize, LineRecord)> {
        let source = self.logical_to_source(logical_line)?;
        self.lines.get(source).map(|record| (source, *record))
    }

    pub fn logical_line_start(&self, logical_line: usize) -> Option<u64> {
        self.record(logical_line).map(|(_, record)| record.position)
    }

    /// Offset of the line's last byte.
    pub fn logical_line_end(&self, logical_line: usize) -> Option<u64> {
        self.record(logical_line).map(|(_, record)| record.last_byte())
    }

    /// Start offset, or 0 for a line that does not exist.
    pub fn logical_line_position(&self, logical_line: usize) -> u64 {
        self.logical_line_start(logical_line).unwrap_or(0)
    }

    /// The visible line containing byte `position`.
    pub fn logical_line_by_position(&self, position: u64) -> Option<usize> {
        let source = self.lines.partition_point(|r| r.end() <= position);
        let record = self.lines.get(source)?;
        if !record.contains(position) {
            return None;
        }
        self.source_to_logical(source)
    }

    /// Number of visible lines spanned by two positions, both ends included.
    pub fn logical_lines_between_positions(&self, from: u64, to: u64) -> Option<usize> {
        let from = self.logical_line_by_position(from)?;
        let to = self.logical_line_by_position(to)?;
        Some(from.abs_diff(to) + 1)
    }

    // ---- content ----

    /// Raw bytes of one visible line, delimiter included. `None` if out of range.
    pub fn logical_line(&mut self, logical_line: usize) -> Result<Option<Arc<[u8]>>> {
        let Some((source, record)) = self.record(logical_line) else {
            return Ok(None);
        };
        if let Some(bytes) = self.cache.get(source) {
            return Ok(Some(bytes));
        }

        let mut bytes = vec![0; record.length as usize];
        let file = self.open_file()?;
        file.seek(SeekFrom::Start(record.position))
            .map_err(|e| LinescopeError::file_error("Failed to seek to line", e))?;
        file.read_exact(&mut bytes)?;

        let bytes: Arc<[u8]> = bytes.into();
        self.cache.insert(source, Arc::clone(&bytes));
        Ok(Some(bytes))
    }

    /// Visible lines `from..=to`, clamped to the line count.
    pub fn logical_lines(&mut self, from: usize, to: usize) -> Result<Vec<Arc<[u8]>>> {
        let count = self.logical_lines_count();
        if count == 0 {
            return Ok(Vec::new());
        }
        let to = to.min(count - 1);
        let mut lines = Vec::with_capacity(to.saturating_sub(from) + 1);
        for line in from..=to {
            if let Some(bytes) = self.logical_line(line)? {
                lines.push(bytes);
            }
        }
        Ok(lines)
    }

    /// Visible lines `from..=to` concatenated.
    pub fn logical_lines_as_text(&mut self, from: usize, to: usize) -> Result<BString> {
        let mut text = Vec::new();
        for line in self.logical_lines(from, to)? {
            text.extend_from_slice(&line);
        }
        Ok(BString::from(text))
    }

    /// Raw bytes `[from, to)`; shorter if the file ends first.
    pub fn text(&mut self, from: u64, to: u64) -> Result<BString> {
        if to <= from {
            return Ok(BString::default());
        }
        let file = self.open_file()?;
        file.seek(SeekFrom::Start(from))
            .map_err(|e| LinescopeError::file_error("Failed to seek", e))?;
        let mut bytes = Vec::new();
        file.take(to - from).read_to_end(&mut bytes)?;
        Ok(BString::from(bytes))
    }

    fn open_file(&mut self) -> Result<&mut File> {
        match self.file {
            Some(ref mut file) => Ok(file),
            None => Err(LinescopeError::unable_to_open(&self.path)),
        }
    }

    /// Where a search from `start_position` begins, and that line's source number.
    fn search_origin(&self, start_position: u64) -> (u64, usize) {
        if start_position == 0 {
            return (0, 0);
        }
        let line = self.lines.partition_point(|r| r.end() <= start_position);
        match self.lines.get(line) {
            Some(record) => (record.position, line),
            None => (self.lines.last().map_or(0, |r| r.end()), self.lines.len()),
        }
    }

    // ---- misc accessors ----

    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub fn current_progress(&self) -> u8 {
        self.supervisor.current_progress()
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
