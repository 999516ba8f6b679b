//! Job orchestration
//!
//! A [`Job`] binds one program to its published processing result. Loading
//! runs the pipeline on the tokio blocking pool; starting a new load
//! cancels the run in flight and its result is discarded. The finished
//! [`JobSnapshot`] is published atomically and announced on the job's
//! [`EventBus`].

mod snapshot;

pub use snapshot::JobSnapshot;

use nckit_core::{
    AppEvent, EventBus, IndexError, JobError, JobEvent, MoveId, SelectionEvent,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::InterpreterConfig;
use crate::diagnostics::Diagnostic;
use crate::gcode::{run_pipeline, CancelToken, PipelineOutput};
use crate::moves::Move;
use crate::program::{has_known_extension, Program};
use crate::selection::SelectionIndex;

/// Job lifecycle
///
/// `Idle -> Loading -> Processing -> Ready | Failed`; `reset` returns to
/// `Idle` from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Idle,
    Loading,
    Processing,
    Ready,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Idle => write!(f, "idle"),
            JobState::Loading => write!(f, "loading"),
            JobState::Processing => write!(f, "processing"),
            JobState::Ready => write!(f, "ready"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Mutable lifecycle data; its mutex is also the publish lock
#[derive(Debug, Default)]
struct Lifecycle {
    state: JobState,
    /// Generation of the most recently started run
    run_generation: u64,
    cancel: Option<CancelToken>,
    program: Option<Arc<Program>>,
    failure: Vec<Diagnostic>,
}

#[derive(Debug)]
struct JobInner {
    config: InterpreterConfig,
    events: Arc<EventBus>,
    lifecycle: Mutex<Lifecycle>,
    snapshot: RwLock<Option<Arc<JobSnapshot>>>,
    /// Generation of the published snapshot, shared with selection indices
    live_generation: Arc<AtomicU64>,
}

/// One processing run handed to a worker
struct Run {
    generation: u64,
    program: Arc<Program>,
    cancel: CancelToken,
}

/// Handle to a background processing run
#[derive(Debug)]
pub struct ProcessingHandle {
    generation: u64,
    identity: String,
    task: JoinHandle<Result<Arc<JobSnapshot>, JobError>>,
}

impl ProcessingHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the run to publish, fail, or be superseded
    pub async fn wait(self) -> Result<Arc<JobSnapshot>, JobError> {
        match self.task.await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!("Processing task for {} ended abnormally: {}", self.identity, err);
                Err(JobError::Cancelled {
                    identity: self.identity,
                })
            }
        }
    }
}

/// Program lifecycle and published move list
///
/// A move list is published only while the job is `Ready`; starting a load,
/// failing or resetting withdraws it.
///
/// Cloning a `Job` gives another handle to the same job.
#[derive(Debug, Clone)]
pub struct Job {
    inner: Arc<JobInner>,
}

impl Default for Job {
    fn default() -> Self {
        Self::new(InterpreterConfig::default())
    }
}

impl Job {
    pub fn new(config: InterpreterConfig) -> Self {
        Self::with_events(config, Arc::new(EventBus::new()))
    }

    /// Create a job that notifies on an existing event bus
    pub fn with_events(config: InterpreterConfig, events: Arc<EventBus>) -> Self {
        Self {
            inner: Arc::new(JobInner {
                config,
                events,
                lifecycle: Mutex::new(Lifecycle::default()),
                snapshot: RwLock::new(None),
                live_generation: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.inner.events
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.inner.config
    }

    pub fn state(&self) -> JobState {
        self.inner.lifecycle.lock().state
    }

    /// The bound program, if any
    pub fn program(&self) -> Option<Arc<Program>> {
        self.inner.lifecycle.lock().program.clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Option<Arc<JobSnapshot>> {
        self.inner.snapshot.read().clone()
    }

    /// Generation of the published snapshot, or of the run that replaced it
    ///
    /// 0 before the first load.
    pub fn generation(&self) -> u64 {
        self.inner.live_generation.load(Ordering::SeqCst)
    }

    /// Diagnostics explaining the last failure
    pub fn failure(&self) -> Vec<Diagnostic> {
        self.inner.lifecycle.lock().failure.clone()
    }

    /// Bind new program text and process it in the background
    pub fn load(
        &self,
        text: impl Into<String>,
        identity: impl Into<String>,
    ) -> Result<ProcessingHandle, JobError> {
        let runtime = Handle::try_current().map_err(|_| JobError::NoRuntime)?;
        let run = self.begin(Arc::new(Program::new(text, identity)));
        Ok(self.spawn(&runtime, run))
    }

    /// Bind new program text and process it on the calling thread
    pub fn load_blocking(
        &self,
        text: impl Into<String>,
        identity: impl Into<String>,
    ) -> Result<Arc<JobSnapshot>, JobError> {
        let run = self.begin(Arc::new(Program::new(text, identity)));
        self.inner.execute(run)
    }

    /// Read a program file and process it in the background
    ///
    /// An unreadable file moves the job to `Failed` with an I/O diagnostic.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<ProcessingHandle, JobError> {
        let path = path.as_ref();
        warn_unknown_extension(path);
        match tokio::fs::read_to_string(path).await {
            Ok(text) => self.load(text, path.display().to_string()),
            Err(err) => Err(self.fail_unreadable(path, err)),
        }
    }

    /// Read a program file and process it on the calling thread
    pub fn load_file_blocking(&self, path: impl AsRef<Path>) -> Result<Arc<JobSnapshot>, JobError> {
        let path = path.as_ref();
        warn_unknown_extension(path);
        match Program::from_file(path) {
            Ok(program) => {
                let run = self.begin(Arc::new(program));
                self.inner.execute(run)
            }
            Err(err) => Err(self.fail_unreadable(path, err)),
        }
    }

    /// Reprocess the bound program in the background
    pub fn reload(&self) -> Result<ProcessingHandle, JobError> {
        let runtime = Handle::try_current().map_err(|_| JobError::NoRuntime)?;
        let program = self.program().ok_or(JobError::NoProgram)?;
        let run = self.begin(program);
        Ok(self.spawn(&runtime, run))
    }

    /// Reprocess the bound program on the calling thread
    pub fn reload_blocking(&self) -> Result<Arc<JobSnapshot>, JobError> {
        let program = self.program().ok_or(JobError::NoProgram)?;
        let run = self.begin(program);
        self.inner.execute(run)
    }

    /// Cancel the run in flight; it ends as `Failed`
    ///
    /// Returns false when nothing was running.
    pub fn cancel(&self) -> bool {
        let lifecycle = self.inner.lifecycle.lock();
        match (&lifecycle.cancel, lifecycle.state) {
            (Some(token), JobState::Loading | JobState::Processing) => {
                tracing::debug!("Cancelling run {}", lifecycle.run_generation);
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Drop the program and published data and return to `Idle`
    ///
    /// Selection indices handed out earlier become stale.
    pub fn reset(&self) {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if let Some(token) = lifecycle.cancel.take() {
                token.cancel();
            }
            lifecycle.run_generation += 1;
            lifecycle.program = None;
            lifecycle.failure.clear();
            lifecycle.state = JobState::Idle;
            self.inner.withdraw(lifecycle.run_generation);
        }
        tracing::debug!("Job reset");
        self.inner.events.notify(AppEvent::Job(JobEvent::Reset));
    }

    /// Select a move by execution-order index
    pub fn select_index(&self, index: usize) -> Result<Move, IndexError> {
        let snapshot = self.snapshot().ok_or(IndexError::NotReady)?;
        let mv = snapshot.index.move_at(index)?.clone();
        self.announce_selection(&snapshot, &mv);
        Ok(mv)
    }

    /// Select a move by id, e.g. from a renderer pick
    pub fn select_move(&self, id: MoveId) -> Result<Move, IndexError> {
        let snapshot = self.snapshot().ok_or(IndexError::NotReady)?;
        let index = snapshot.index.index_of(id)?;
        let mv = snapshot.index.move_at(index)?.clone();
        self.announce_selection(&snapshot, &mv);
        Ok(mv)
    }

    /// Selection index of the published snapshot
    pub fn selection_index(&self) -> Result<SelectionIndex, IndexError> {
        self.snapshot()
            .map(|snapshot| snapshot.index.clone())
            .ok_or(IndexError::NotReady)
    }

    fn announce_selection(&self, snapshot: &JobSnapshot, mv: &Move) {
        tracing::trace!("Selected move {} on line {}", mv.index, mv.line);
        self.inner
            .events
            .notify(AppEvent::Selection(SelectionEvent::MoveSelected {
                generation: snapshot.generation,
                index: mv.index,
                line: mv.line,
                move_id: mv.id,
            }));
    }

    /// Start a new run, superseding the one in flight
    fn begin(&self, program: Arc<Program>) -> Run {
        let run = {
            let mut lifecycle = self.inner.lifecycle.lock();
            if let Some(previous) = lifecycle.cancel.take() {
                previous.cancel();
            }
            lifecycle.run_generation += 1;
            let cancel = CancelToken::new();
            lifecycle.cancel = Some(cancel.clone());
            lifecycle.program = Some(Arc::clone(&program));
            lifecycle.failure.clear();
            lifecycle.state = JobState::Loading;
            self.inner.withdraw(lifecycle.run_generation);
            Run {
                generation: lifecycle.run_generation,
                program,
                cancel,
            }
        };

        tracing::debug!(
            "Loaded {} ({} lines) as run {}",
            run.program.identity(),
            run.program.line_count(),
            run.generation
        );
        self.inner.events.notify(AppEvent::Job(JobEvent::Loaded {
            generation: run.generation,
            identity: run.program.identity().to_string(),
            line_count: run.program.line_count(),
        }));
        run
    }

    fn spawn(&self, runtime: &Handle, run: Run) -> ProcessingHandle {
        let generation = run.generation;
        let identity = run.program.identity().to_string();
        let inner = Arc::clone(&self.inner);
        let task = runtime.spawn_blocking(move || inner.execute(run));
        ProcessingHandle {
            generation,
            identity,
            task,
        }
    }

    fn fail_unreadable(&self, path: &Path, err: std::io::Error) -> JobError {
        let error = JobError::Unreadable {
            identity: path.display().to_string(),
            reason: err.to_string(),
        };
        let generation = {
            let mut lifecycle = self.inner.lifecycle.lock();
            if let Some(token) = lifecycle.cancel.take() {
                token.cancel();
            }
            lifecycle.run_generation += 1;
            lifecycle.state = JobState::Failed;
            lifecycle.failure = vec![Diagnostic::job(&error)];
            self.inner.withdraw(lifecycle.run_generation);
            lifecycle.run_generation
        };

        tracing::warn!("{}", error);
        self.inner
            .events
            .notify(AppEvent::Job(JobEvent::ProcessingFailed {
                generation,
                identity: path.display().to_string(),
                reason: error.to_string(),
            }));
        error
    }
}

impl JobInner {
    /// Unpublish the current snapshot; indices handed out earlier go stale
    ///
    /// Called with the lifecycle lock held.
    fn withdraw(&self, generation: u64) {
        let mut slot = self.snapshot.write();
        self.live_generation.store(generation, Ordering::SeqCst);
        *slot = None;
    }

    fn is_current(&self, lifecycle: &Lifecycle, generation: u64) -> bool {
        lifecycle.run_generation == generation
    }

    fn execute(&self, run: Run) -> Result<Arc<JobSnapshot>, JobError> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if !self.is_current(&lifecycle, run.generation) {
                tracing::debug!("Run {} superseded before it started", run.generation);
                return Err(JobError::Superseded {
                    generation: run.generation,
                });
            }
            lifecycle.state = JobState::Processing;
        }

        self.events.notify(AppEvent::Job(JobEvent::ProcessingStarted {
            generation: run.generation,
            identity: run.program.identity().to_string(),
        }));

        let result = run_pipeline(&run.program, &self.config, &run.cancel);
        self.finish(run, result)
    }

    /// Publish or fail a finished run, discarding it if superseded
    fn finish(
        &self,
        run: Run,
        result: Result<PipelineOutput, JobError>,
    ) -> Result<Arc<JobSnapshot>, JobError> {
        let mut lifecycle = self.lifecycle.lock();
        if !self.is_current(&lifecycle, run.generation) {
            tracing::debug!(
                "Discarding result of superseded run {} for {}",
                run.generation,
                run.program.identity()
            );
            return Err(JobError::Superseded {
                generation: run.generation,
            });
        }

        let identity = run.program.identity().to_string();
        let result = match result {
            Ok(_) if run.cancel.is_cancelled() => Err(JobError::Cancelled {
                identity: identity.clone(),
            }),
            other => other,
        };
        lifecycle.cancel = None;

        match result {
            Ok(output) => {
                let moves = Arc::new(output.moves);
                let snapshot = Arc::new(JobSnapshot {
                    generation: run.generation,
                    identity: identity.clone(),
                    program: Arc::clone(&run.program),
                    index: SelectionIndex::new(
                        Arc::clone(&moves),
                        run.generation,
                        Arc::clone(&self.live_generation),
                    ),
                    moves,
                    diagnostics: output.diagnostics,
                    final_state: output.final_state,
                });
                {
                    let mut slot = self.snapshot.write();
                    self.live_generation.store(run.generation, Ordering::SeqCst);
                    *slot = Some(Arc::clone(&snapshot));
                }
                lifecycle.state = JobState::Ready;
                drop(lifecycle);

                tracing::debug!(
                    "Published run {} for {}: {} moves",
                    run.generation,
                    identity,
                    snapshot.move_count()
                );
                self.events
                    .notify(AppEvent::Job(JobEvent::ProcessingFinished {
                        generation: run.generation,
                        identity,
                        move_count: snapshot.move_count(),
                        diagnostic_count: snapshot.diagnostics.len(),
                    }));
                Ok(snapshot)
            }
            Err(err) => {
                lifecycle.state = JobState::Failed;
                lifecycle.failure = vec![Diagnostic::job(&err)];
                drop(lifecycle);

                tracing::warn!("Run {} failed: {}", run.generation, err);
                self.events.notify(AppEvent::Job(JobEvent::ProcessingFailed {
                    generation: run.generation,
                    identity,
                    reason: err.to_string(),
                }));
                Err(err)
            }
        }
    }
}

fn warn_unknown_extension(path: &Path) {
    if !has_known_extension(path) {
        tracing::warn!(
            "{} is not an .nc or .tap file, loading it anyway",
            path.display()
        );
    }
}
