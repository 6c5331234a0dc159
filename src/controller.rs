//! Run lifecycle control.
//!
//! A [`RunController`] owns the single active run. It spawns the enrichment
//! worker on the tokio runtime, tracks the [`RunState`] and publishes
//! [`RunEvent`]s over an unbounded channel that the front-end drains.
//!
//! Only one run can be active. Calling [`RunController::start`] while a run is
//! in progress requests cancellation instead of starting a second run.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::enrich::{self, Progress, RunReport};
use crate::models::RunSummary;
use crate::sources::LookupSource;
use crate::spreadsheet;

/// Processing state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// Cancellation requested, waiting for the in-flight row to finish
    Cancelling,
}

/// Events published by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started { input: PathBuf, output: PathBuf },
    Progress(Progress),
    Completed { output_path: PathBuf, summary: RunSummary },
    Cancelled { processed: usize },
    Failed { message: String },
}

impl RunEvent {
    /// Whether this is the last event of a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunEvent::Completed { .. } | RunEvent::Cancelled { .. } | RunEvent::Failed { .. }
        )
    }
}

/// What a start or cancel request ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Started,
    CancelRequested,
    AlreadyCancelling,
    NotRunning,
}

#[derive(Debug)]
struct Shared {
    state: RunState,
    cancel: Option<CancellationToken>,
}

/// Starts, cancels and reports on enrichment runs.
#[derive(Debug)]
pub struct RunController {
    source: Arc<dyn LookupSource>,
    events: mpsc::UnboundedSender<RunEvent>,
    shared: Arc<Mutex<Shared>>,
}

impl RunController {
    /// Create a controller and the receiving end of its event channel.
    pub fn new(source: Arc<dyn LookupSource>) -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let controller = Self {
            source,
            events,
            shared: Arc::new(Mutex::new(Shared {
                state: RunState::Idle,
                cancel: None,
            })),
        };
        (controller, rx)
    }

    pub fn state(&self) -> RunState {
        lock(&self.shared).state
    }

    /// Start a run on `input`, or request cancellation if one is active.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, input: impl AsRef<Path>) -> ControlAction {
        let mut shared = lock(&self.shared);
        if shared.state != RunState::Idle {
            return request_cancel(&mut shared);
        }

        let cancel = CancellationToken::new();
        shared.state = RunState::Running;
        shared.cancel = Some(cancel.clone());
        drop(shared);

        let input = input.as_ref().to_path_buf();
        let output = spreadsheet::output_path(&input);
        tracing::debug!("Starting run on {}", input.display());
        let _ = self.events.send(RunEvent::Started {
            input: input.clone(),
            output,
        });

        tokio::spawn(drive(
            Arc::clone(&self.source),
            input,
            self.events.clone(),
            Arc::clone(&self.shared),
            cancel,
        ));

        ControlAction::Started
    }

    /// Request cancellation of the active run, if any.
    pub fn cancel(&self) -> ControlAction {
        let mut shared = lock(&self.shared);
        if shared.state == RunState::Idle {
            return ControlAction::NotRunning;
        }
        request_cancel(&mut shared)
    }
}

fn request_cancel(shared: &mut Shared) -> ControlAction {
    match shared.state {
        RunState::Idle => ControlAction::NotRunning,
        RunState::Cancelling => ControlAction::AlreadyCancelling,
        RunState::Running => {
            if let Some(cancel) = &shared.cancel {
                cancel.cancel();
            }
            shared.state = RunState::Cancelling;
            tracing::info!("Cancellation requested, stopping after the current record");
            ControlAction::CancelRequested
        }
    }
}

/// Worker body. The pipeline runs on its own task so a panic surfaces as a
/// join error and still ends in a terminal event.
async fn drive(
    source: Arc<dyn LookupSource>,
    input: PathBuf,
    events: mpsc::UnboundedSender<RunEvent>,
    shared: Arc<Mutex<Shared>>,
    cancel: CancellationToken,
) {
    let progress_tx = events.clone();
    let task = tokio::spawn(async move {
        enrich::process_file(
            &input,
            source.as_ref(),
            move |progress| {
                let _ = progress_tx.send(RunEvent::Progress(progress));
            },
            &cancel,
        )
        .await
    });

    let event = match task.await {
        Ok(Ok(RunReport::Completed {
            output_path,
            summary,
        })) => RunEvent::Completed {
            output_path,
            summary,
        },
        Ok(Ok(RunReport::Cancelled { processed })) => RunEvent::Cancelled { processed },
        Ok(Err(e)) => {
            tracing::error!("Run failed: {}", e);
            RunEvent::Failed {
                message: e.to_string(),
            }
        }
        Err(e) => {
            tracing::error!("Run aborted: {}", e);
            RunEvent::Failed {
                message: format!("Unexpected failure: {}", e),
            }
        }
    };

    {
        let mut shared = lock(&shared);
        shared.state = RunState::Idle;
        shared.cancel = None;
    }
    let _ = events.send(event);
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LookupOutcome, Record};
    use crate::sources::MockSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::Semaphore;

    /// Blocks every lookup until a permit is added.
    #[derive(Debug)]
    struct GatedSource {
        gate: Semaphore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LookupSource for GatedSource {
        fn id(&self) -> &str {
            "gated"
        }

        fn name(&self) -> &str {
            "Gated"
        }

        async fn lookup(&self, _record: &Record) -> LookupOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            LookupOutcome::NotFound
        }
    }

    #[derive(Debug)]
    struct PanickingSource;

    #[async_trait]
    impl LookupSource for PanickingSource {
        fn id(&self) -> &str {
            "panic"
        }

        fn name(&self) -> &str {
            "Panic"
        }

        async fn lookup(&self, _record: &Record) -> LookupOutcome {
            panic!("lookup exploded");
        }
    }

    async fn until_terminal(rx: &mut mpsc::UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
        let mut events = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("run did not finish")
                .expect("channel closed");
            let done = event.is_terminal();
            events.push(event);
            if done {
                return events;
            }
        }
    }

    fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_completed_run_events() {
        let dir = tempdir().unwrap();
        let input = write_csv(dir.path(), "refs.csv", "Title,Journal,Year\nA,J,2001\nB,J,2002\n");

        let source = Arc::new(MockSource::new());
        source.set_response("A", LookupOutcome::Found("10.1/a".to_string()));
        let (controller, mut rx) = RunController::new(source);

        assert_eq!(controller.start(&input), ControlAction::Started);
        let events = until_terminal(&mut rx).await;

        assert_eq!(
            events.first(),
            Some(&RunEvent::Started {
                input: input.clone(),
                output: dir.path().join("refs_with_doi.csv"),
            })
        );
        let processed = events
            .iter()
            .filter(|e| matches!(e, RunEvent::Progress(Progress::Processed { .. })))
            .count();
        assert_eq!(processed, 2);
        assert_eq!(
            events.last(),
            Some(&RunEvent::Completed {
                output_path: dir.path().join("refs_with_doi.csv"),
                summary: RunSummary {
                    total: 2,
                    success: 1,
                    errors: 0
                },
            })
        );
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn test_second_start_cancels_active_run() {
        let dir = tempdir().unwrap();
        let input = write_csv(dir.path(), "refs.csv", "Title,Journal,Year\nA,,\nB,,\nC,,\n");

        let source = Arc::new(GatedSource {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        });
        let (controller, mut rx) = RunController::new(source.clone());

        assert_eq!(controller.start(&input), ControlAction::Started);

        // Wait until the first lookup is in flight
        loop {
            match rx.recv().await {
                Some(RunEvent::Progress(Progress::Querying { index: 0, .. })) => break,
                Some(_) => continue,
                None => panic!("channel closed"),
            }
        }

        assert_eq!(controller.start(&input), ControlAction::CancelRequested);
        assert_eq!(controller.state(), RunState::Cancelling);
        assert_eq!(controller.start(&input), ControlAction::AlreadyCancelling);

        source.gate.add_permits(1);
        let events = until_terminal(&mut rx).await;

        assert_eq!(events.last(), Some(&RunEvent::Cancelled { processed: 1 }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), RunState::Idle);
        assert!(!dir.path().join("refs_with_doi.csv").exists());
    }

    #[tokio::test]
    async fn test_schema_failure_reports_and_resets() {
        let dir = tempdir().unwrap();
        let input = write_csv(dir.path(), "refs.csv", "Name,Venue\nA,B\n");

        let (controller, mut rx) = RunController::new(Arc::new(MockSource::new()));
        controller.start(&input);
        let events = until_terminal(&mut rx).await;

        match events.last() {
            Some(RunEvent::Failed { message }) => {
                assert!(message.contains("Title, Journal and Year"));
                assert!(message.contains("Name"));
            }
            other => panic!("unexpected final event: {:?}", other),
        }
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let dir = tempdir().unwrap();
        let (controller, mut rx) = RunController::new(Arc::new(MockSource::new()));

        controller.start(dir.path().join("absent.csv"));
        let events = until_terminal(&mut rx).await;

        assert!(matches!(events.last(), Some(RunEvent::Failed { .. })));
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn test_panicking_source_is_caught() {
        let dir = tempdir().unwrap();
        let input = write_csv(dir.path(), "refs.csv", "Title,Journal,Year\nA,J,2001\n");

        let (controller, mut rx) = RunController::new(Arc::new(PanickingSource));
        controller.start(&input);
        let events = until_terminal(&mut rx).await;

        assert!(matches!(events.last(), Some(RunEvent::Failed { .. })));
        assert_eq!(controller.state(), RunState::Idle);
        assert!(!dir.path().join("refs_with_doi.csv").exists());

        // The controller accepts a new run afterwards
        assert_eq!(controller.start(&input), ControlAction::Started);
        until_terminal(&mut rx).await;
    }

    #[tokio::test]
    async fn test_cancel_when_idle() {
        let (controller, _rx) = RunController::new(Arc::new(MockSource::new()));
        assert_eq!(controller.cancel(), ControlAction::NotRunning);
        assert_eq!(controller.state(), RunState::Idle);
    }
}
