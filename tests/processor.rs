use linescope::diagnostics::Diagnostics;
use linescope::processor::{
    Dispatch, EventKind, Operation, ProcessingSupervisor, ProcessorCommand, ProcessorEvent,
};
use linescope::{EngineConfig, LineRecord, LinescopeError};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

const TIMEOUT_MS: u64 = 5000;

async fn next_event(rx: &mut mpsc::UnboundedReceiver<ProcessorEvent>) -> ProcessorEvent {
    timeout(Duration::from_millis(TIMEOUT_MS), rx.recv())
        .await
        .expect("worker event timed out")
        .expect("worker channel closed unexpectedly")
}

fn spawn_supervisor() -> (ProcessingSupervisor, mpsc::UnboundedReceiver<ProcessorEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let supervisor =
        ProcessingSupervisor::spawn(&EngineConfig::default(), Diagnostics::default(), tx)
            .expect("spawn supervisor");
    (supervisor, rx)
}

fn large_file(lines: usize) -> NamedTempFile {
    let file = NamedTempFile::new().expect("create temp file");
    let mut content = String::new();
    for i in 0..lines {
        content.push_str(&format!("2024-09-02 INFO request {i} handled\n"));
    }
    std::fs::write(file.path(), content).expect("write contents");
    file
}

fn index_command(path: PathBuf) -> ProcessorCommand {
    ProcessorCommand::CreateIndex {
        path,
        notify_per_line: 10,
        block_size: 64,
    }
}

fn collect_records(events: Vec<ProcessorEvent>) -> (Vec<LineRecord>, bool) {
    let mut records = Vec::new();
    let mut completed = false;
    for event in events {
        if let ProcessorEvent::IndexBatch(batch) = event {
            records.extend(batch.records);
            completed |= batch.completed;
        }
    }
    (records, completed)
}

#[tokio::test]
async fn index_runs_to_completion_and_reports_full_progress() {
    let file = large_file(1000);
    let (supervisor, mut rx) = spawn_supervisor();

    assert_eq!(
        supervisor.dispatch(index_command(file.path().to_path_buf())).unwrap(),
        Dispatch::Accepted
    );

    let mut events = Vec::new();
    let (mut finished, mut full) = (false, false);
    while !(finished && full) {
        let event = next_event(&mut rx).await;
        match event.kind() {
            EventKind::Index { completed: true } => finished = true,
            EventKind::Progress(100) => full = true,
            _ => {}
        }
        events.push(event);
    }

    let (records, completed) = collect_records(events);
    assert!(completed);
    assert_eq!(records.len(), 1000);
    assert_eq!(supervisor.current_progress(), 100);
    assert!(!supervisor.is_busy());
}

#[tokio::test]
async fn interrupt_leaves_worker_idle_and_silent() {
    let file = large_file(50_000);
    let (supervisor, mut rx) = spawn_supervisor();

    supervisor
        .dispatch(index_command(file.path().to_path_buf()))
        .unwrap();
    supervisor.interrupt();
    assert!(!supervisor.is_busy());

    let mut before = Vec::new();
    while let Ok(event) = rx.try_recv() {
        before.push(event);
    }

    // Nothing more may arrive for the interrupted operation.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let late: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|event| event.kind())
        .filter(|kind| !matches!(kind, EventKind::Progress(_)))
        .collect();
    assert!(late.is_empty(), "unexpected events after interrupt: {late:?}");

    let completions = before
        .iter()
        .filter(|event| event.kind() == EventKind::Index { completed: true })
        .count();
    assert!(completions <= 1);

    // The worker accepts new work right away.
    assert_eq!(
        supervisor
            .dispatch(index_command(file.path().to_path_buf()))
            .unwrap(),
        Dispatch::Accepted
    );
}

#[tokio::test]
async fn second_operation_is_rejected_while_claimed() {
    let file = large_file(50_000);
    let (supervisor, mut rx) = spawn_supervisor();

    supervisor
        .dispatch(index_command(file.path().to_path_buf()))
        .unwrap();
    let second = supervisor
        .dispatch(index_command(file.path().to_path_buf()))
        .unwrap();

    // Either the first operation is still claimed, or it already finished.
    if second == Dispatch::Accepted {
        let mut completions = 0;
        while completions < 2 {
            if next_event(&mut rx).await.kind() == (EventKind::Index { completed: true }) {
                completions += 1;
            }
        }
    } else {
        assert_eq!(second, Dispatch::Rejected);
    }
    supervisor.interrupt();
}

#[tokio::test]
async fn missing_file_reports_failure_and_releases_claim() {
    let dir = tempfile::tempdir().unwrap();
    let (supervisor, mut rx) = spawn_supervisor();

    supervisor
        .dispatch(index_command(dir.path().join("missing.log")))
        .unwrap();

    loop {
        match next_event(&mut rx).await {
            ProcessorEvent::Failed { operation, error } => {
                assert_eq!(operation, Operation::CreateIndex);
                assert!(matches!(error, LinescopeError::UnableToOpenFile { .. }));
                break;
            }
            ProcessorEvent::Progress(_) => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert!(!supervisor.is_busy());
}

#[tokio::test]
async fn read_failure_reports_failure_instead_of_completion() {
    // A directory opens fine on Linux but cannot be read.
    let dir = tempfile::tempdir().unwrap();
    let (supervisor, mut rx) = spawn_supervisor();

    supervisor
        .dispatch(index_command(dir.path().to_path_buf()))
        .unwrap();

    loop {
        match next_event(&mut rx).await {
            ProcessorEvent::Failed { operation, error } => {
                assert_eq!(operation, Operation::CreateIndex);
                assert!(matches!(error, LinescopeError::FileError { .. }));
                break;
            }
            ProcessorEvent::Progress(_) => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert!(!supervisor.is_busy());
}

#[tokio::test]
async fn queued_command_runs_before_overdue_watch_poll() {
    let indexed = large_file(200_000);
    let watched = large_file(3);
    let (supervisor, mut rx) = spawn_supervisor();

    supervisor
        .enable_watch(watched.path(), LineRecord::EMPTY, Duration::from_millis(20))
        .unwrap();
    supervisor
        .dispatch(index_command(indexed.path().to_path_buf()))
        .unwrap();
    // Queued behind the index; the poll falls due while the index runs.
    supervisor.disable_watch().unwrap();

    let mut records = 0;
    loop {
        if let ProcessorEvent::IndexBatch(batch) = next_event(&mut rx).await {
            records += batch.records.len();
            if batch.completed {
                break;
            }
        }
    }
    assert_eq!(records, 200_000);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let late: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|event| event.kind())
        .filter(|kind| !matches!(kind, EventKind::Progress(_)))
        .collect();
    assert!(late.is_empty(), "watch poll ran after being disabled: {late:?}");
}

#[tokio::test]
async fn dispatch_after_shutdown_reports_unavailable_worker() {
    let (mut supervisor, _rx) = spawn_supervisor();
    supervisor.shutdown();

    let err = supervisor
        .dispatch(ProcessorCommand::DisableWatch)
        .unwrap_err();
    assert!(matches!(err, LinescopeError::WorkerUnavailable));

    let file = large_file(1);
    let err = supervisor
        .dispatch(index_command(file.path().to_path_buf()))
        .unwrap_err();
    assert!(matches!(err, LinescopeError::WorkerUnavailable));
    assert!(!supervisor.is_busy());
}

#[tokio::test]
async fn shutdown_during_scan_joins_promptly() {
    let file = large_file(50_000);
    let (supervisor, _rx) = spawn_supervisor();
    supervisor
        .dispatch(index_command(file.path().to_path_buf()))
        .unwrap();

    let joined = timeout(
        Duration::from_millis(TIMEOUT_MS),
        tokio::task::spawn_blocking(move || drop(supervisor)),
    )
    .await;
    assert!(joined.is_ok(), "worker did not stop after shutdown");
}

#[tokio::test]
async fn watch_commands_toggle_state() {
    let file = large_file(2);
    let (supervisor, _rx) = spawn_supervisor();
    assert!(!supervisor.is_watch_enabled());

    supervisor
        .enable_watch(file.path(), LineRecord::EMPTY, Duration::from_millis(10))
        .unwrap();
    assert!(supervisor.is_watch_enabled());

    supervisor.disable_watch().unwrap();
    assert!(!supervisor.is_watch_enabled());
}
