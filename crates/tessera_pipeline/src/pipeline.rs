//! # Pipeline Scheduler
//!
//! Records every grid-producing call as an entry of an implicit dependency
//! graph and runs the graph on a worker pool.
//!
//! ## Protocol
//!
//! ```text
//!   track / add ... add      (graph construction, never blocks)
//!   start                    (freezes the graph, releases ready entries)
//!   await_grids / join       (block on results)
//!   reset                    (promote results to initial state, build again)
//! ```
//!
//! ## Dependency Inference
//!
//! Each dependency resolves to the most recent entry whose result is that
//! grid (last writer wins), or to the grid's initial snapshot when nothing
//! has produced it yet. An entry runs once every producer it depends on has
//! completed. Siblings are unordered.
//!
//! ## Failure
//!
//! A task error or panic is logged with the entry index, declared and
//! received inputs and the call site. The pipeline then aborts: every entry
//! not yet completed becomes `Aborted` and `join` returns
//! [`PipelineError::Aborted`]. There is no retry.

use std::any::Any;
use std::collections::HashMap;
use std::io;
use std::panic::{self, AssertUnwindSafe, Location};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};

use tessera_core::SymmetrySettings;

use crate::config::PipelineConfig;
use crate::determinism::{DeterminismLog, HashRecord};
use crate::entry::{Dependency, Entry, EntryStatus, NodeTask, Source};
use crate::error::{NodeError, NodeFailure, PipelineError, PipelineResult};
use crate::pool::{Job, WorkerPool};
use crate::snapshot::{GridId, GridKind, SharedSnapshot};

/// Declaration-time metadata of a tracked grid.
#[derive(Clone, Debug, PartialEq)]
pub struct GridInfo {
    /// Debug name.
    pub name: String,
    /// Side length.
    pub size: usize,
    /// Symmetry settings.
    pub settings: SymmetrySettings,
    /// Element type.
    pub kind: GridKind,
}

impl GridInfo {
    fn of(snapshot: &SharedSnapshot) -> Self {
        Self {
            name: snapshot.debug_name().to_owned(),
            size: snapshot.size(),
            settings: snapshot.symmetry_settings(),
            kind: snapshot.kind(),
        }
    }
}

struct GridRecord {
    info: GridInfo,
    root: Option<SharedSnapshot>,
    last_producer: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Building,
    Running,
    Finished,
}

struct GraphState {
    phase: Phase,
    entries: Vec<Arc<Entry>>,
    /// Unfinished producers per entry.
    pending: Vec<usize>,
    /// Entries waiting on each entry.
    dependants: Vec<Vec<usize>>,
    grids: HashMap<GridId, GridRecord>,
    next_grid: u32,
    /// Entries not yet terminal.
    remaining: usize,
    failure: Option<NodeFailure>,
    /// Entries dropped by earlier resets; keeps log sequence numbers unique.
    sequence_base: usize,
}

impl GraphState {
    fn record(&self, id: GridId) -> PipelineResult<&GridRecord> {
        self.grids.get(&id).ok_or(PipelineError::UnknownGrid(id))
    }

    fn insert(&mut self, info: GridInfo, root: Option<SharedSnapshot>) -> GridId {
        let id = GridId(self.next_grid);
        self.next_grid += 1;
        self.grids.insert(
            id,
            GridRecord {
                info,
                root,
                last_producer: None,
            },
        );
        id
    }
}

/// State shared between the pipeline handle and its workers.
pub(crate) struct Shared {
    config: PipelineConfig,
    state: Mutex<GraphState>,
    /// Signalled whenever an entry finishes or the run aborts.
    progress: Condvar,
    aborted: AtomicBool,
    log: Mutex<DeterminismLog>,
}

impl Shared {
    /// Executes one entry on the calling worker.
    pub(crate) fn run(&self, index: usize, sender: &Sender<Job>) {
        if self.aborted.load(Ordering::Acquire) {
            return;
        }

        let (entry, inputs) = {
            let state = self.state.lock();
            let Some(entry) = state.entries.get(index).map(Arc::clone) else {
                return;
            };
            let inputs: Result<Vec<SharedSnapshot>, String> = entry
                .dependencies
                .iter()
                .map(|dependency| match &dependency.source {
                    Source::Root(snapshot) => Ok(SharedSnapshot::clone(snapshot)),
                    Source::Entry(producer) => state.entries[*producer]
                        .snapshot()
                        .ok_or_else(|| dependency.name.clone()),
                })
                .collect();
            (entry, inputs)
        };

        let Some(task) = entry.begin() else {
            return;
        };
        tracing::trace!(
            index,
            grid = %entry.result_name,
            method = %entry.method,
            "running node"
        );

        let (outcome, received) = match inputs {
            Ok(inputs) => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(inputs.as_slice())))
                    .unwrap_or_else(|payload| Err(NodeError::Panicked(panic_message(payload.as_ref()))));
                let received = inputs.iter().map(|s| s.debug_name().to_owned()).collect();
                (outcome, received)
            }
            Err(missing) => (Err(NodeError::MissingInput(missing)), Vec::new()),
        };

        let outcome = outcome.and_then(|snapshot| {
            if snapshot.kind() == entry.result_kind {
                Ok(snapshot)
            } else {
                Err(NodeError::TypeMismatch {
                    name: snapshot.debug_name().to_owned(),
                    expected: entry.result_kind,
                    actual: snapshot.kind(),
                })
            }
        });

        match outcome {
            Ok(snapshot) => self.finish(&entry, snapshot, sender),
            Err(error) => {
                let failure = NodeFailure {
                    index,
                    grid: entry.result_name.clone(),
                    method: entry.method.clone(),
                    location: entry.location,
                    declared: entry.dependencies.iter().map(|d| d.name.clone()).collect(),
                    received,
                    error,
                };
                tracing::error!(
                    index,
                    grid = %failure.grid,
                    method = %failure.method,
                    location = %failure.location,
                    declared = ?failure.declared,
                    received = ?failure.received,
                    "node failed: {}",
                    failure.error
                );
                self.abort(Some(failure));
            }
        }
    }

    fn finish(&self, entry: &Entry, snapshot: SharedSnapshot, sender: &Sender<Job>) {
        let hash = self.config.hashing_enabled().then(|| snapshot.content_hash());
        if !entry.complete(snapshot) {
            return;
        }

        let ready = {
            let mut state = self.state.lock();
            if self.aborted.load(Ordering::Acquire) {
                return;
            }
            if let Some(hash) = hash {
                self.log.lock().record(
                    state.sequence_base + entry.index,
                    HashRecord {
                        hash,
                        location: entry.location,
                        grid: entry.result_name.clone(),
                        method: entry.method.clone(),
                    },
                );
            }

            let GraphState {
                pending,
                dependants,
                ..
            } = &mut *state;
            let mut ready = Vec::new();
            for &dependant in &dependants[entry.index] {
                pending[dependant] -= 1;
                if pending[dependant] == 0 {
                    ready.push(dependant);
                }
            }

            state.remaining = state.remaining.saturating_sub(1);
            if state.remaining == 0 {
                state.phase = Phase::Finished;
                tracing::info!("pipeline drained: {} entries", state.entries.len());
            }
            self.progress.notify_all();
            ready
        };

        for index in ready {
            // Cannot fail while this worker holds a receiver
            let _ = sender.send(Job::Run(index));
        }
    }

    /// Abandons the run. `None` cancels without a node failure.
    fn abort(&self, failure: Option<NodeFailure>) {
        self.aborted.store(true, Ordering::Release);
        let mut state = self.state.lock();
        if let Some(failure) = failure {
            if let Some(entry) = state.entries.get(failure.index) {
                entry.fail();
            }
            if state.failure.is_none() {
                state.failure = Some(failure);
            }
        }

        let aborted = state.entries.iter().filter(|entry| entry.abort()).count();
        if aborted > 0 {
            tracing::warn!("pipeline aborted: {aborted} entries discarded");
        }
        state.remaining = 0;
        state.phase = Phase::Finished;
        self.progress.notify_all();
    }

    fn aborted_error(&self) -> PipelineError {
        match &self.state.lock().failure {
            Some(failure) => PipelineError::Aborted {
                failure: failure.clone(),
            },
            None => PipelineError::Cancelled,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Dependency-tracked grid scheduler for one generation run.
///
/// Dropping a pipeline that is still running cancels it and waits for the
/// workers to exit.
pub struct Pipeline {
    shared: Arc<Shared>,
    pool: Mutex<Option<WorkerPool>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(GraphState {
                    phase: Phase::Building,
                    entries: Vec::new(),
                    pending: Vec::new(),
                    dependants: Vec::new(),
                    grids: HashMap::new(),
                    next_grid: 0,
                    remaining: 0,
                    failure: None,
                    sequence_base: 0,
                }),
                progress: Condvar::new(),
                aborted: AtomicBool::new(false),
                log: Mutex::new(DeterminismLog::default()),
            }),
            pool: Mutex::new(None),
        }
    }

    /// Settings this pipeline runs with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.shared.config
    }

    /// Tracks a grid whose current content is its initial state.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AlreadyStarted`] after `start`.
    pub fn register(&self, snapshot: SharedSnapshot) -> PipelineResult<GridId> {
        let mut state = self.shared.state.lock();
        if state.phase != Phase::Building {
            return Err(PipelineError::AlreadyStarted);
        }
        let info = GridInfo::of(&snapshot);
        let id = state.insert(info, Some(snapshot));
        tracing::debug!("tracking grid {id}");
        Ok(id)
    }

    /// Tracks a grid that has no initial state; something must produce it
    /// before anything reads it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AlreadyStarted`] after `start`.
    pub fn declare(&self, info: GridInfo) -> PipelineResult<GridId> {
        let mut state = self.shared.state.lock();
        if state.phase != Phase::Building {
            return Err(PipelineError::AlreadyStarted);
        }
        Ok(state.insert(info, None))
    }

    /// Metadata of a tracked grid. `size` follows every recorded resize.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownGrid`].
    pub fn info(&self, id: GridId) -> PipelineResult<GridInfo> {
        Ok(self.shared.state.lock().record(id)?.info.clone())
    }

    /// Records the size a grid will have once its latest producer ran.
    pub(crate) fn set_size(&self, id: GridId, size: usize) -> PipelineResult<()> {
        let mut state = self.shared.state.lock();
        if state.phase != Phase::Building {
            return Err(PipelineError::AlreadyStarted);
        }
        let record = state
            .grids
            .get_mut(&id)
            .ok_or(PipelineError::UnknownGrid(id))?;
        record.info.size = size;
        Ok(())
    }

    /// Fails unless both grids carry the same symmetry settings.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Grid`] wrapping a symmetry mismatch, or
    /// [`PipelineError::UnknownGrid`].
    pub fn check_compatible(&self, left: GridId, right: GridId) -> PipelineResult<()> {
        let state = self.shared.state.lock();
        let (left, right) = (state.record(left)?, state.record(right)?);
        if left.info.settings == right.info.settings {
            Ok(())
        } else {
            Err(tessera_core::GridError::SymmetryMismatch {
                left: left.info.settings,
                right: right.info.settings,
            }
            .into())
        }
    }

    /// Records a deferred computation and returns its entry index.
    ///
    /// `executing` is the grid the call was made on, `result` the grid the
    /// task's snapshot becomes. The task receives one snapshot per
    /// `dependencies` element, in order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AlreadyStarted`] after `start`,
    /// [`PipelineError::UnknownGrid`] for untracked ids and
    /// [`PipelineError::NoProducer`] when reading a grid nothing produces.
    #[track_caller]
    pub fn add(
        &self,
        executing: GridId,
        result: GridId,
        dependencies: &[GridId],
        method: impl Into<String>,
        task: NodeTask,
    ) -> PipelineResult<usize> {
        let location = Location::caller();
        let method = method.into();

        let mut state = self.shared.state.lock();
        if state.phase != Phase::Building {
            return Err(PipelineError::AlreadyStarted);
        }
        state.record(executing)?;
        let (result_name, result_kind) = {
            let record = state.record(result)?;
            (record.info.name.clone(), record.info.kind)
        };

        let mut resolved = Vec::with_capacity(dependencies.len());
        let mut producers = Vec::new();
        for &grid in dependencies {
            let record = state.record(grid)?;
            let source = match (record.last_producer, &record.root) {
                (Some(producer), _) => {
                    if !producers.contains(&producer) {
                        producers.push(producer);
                    }
                    Source::Entry(producer)
                }
                (None, Some(root)) => Source::Root(SharedSnapshot::clone(root)),
                (None, None) => return Err(PipelineError::NoProducer(grid)),
            };
            resolved.push(Dependency {
                name: record.info.name.clone(),
                source,
            });
        }

        let index = state.entries.len();
        for &producer in &producers {
            state.dependants[producer].push(index);
        }
        state.pending.push(producers.len());
        state.dependants.push(Vec::new());
        if let Some(record) = state.grids.get_mut(&result) {
            record.last_producer = Some(index);
        }
        state.entries.push(Arc::new(Entry::new(
            index,
            executing,
            result,
            result_name,
            result_kind,
            resolved,
            method,
            location,
            task,
        )));
        state.remaining += 1;

        tracing::debug!(
            index,
            executing = %executing,
            result = %result,
            waits_on = producers.len(),
            "added node at {location}"
        );
        Ok(index)
    }

    /// Freezes the graph and starts executing it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AlreadyStarted`] on a second call.
    pub fn start(&self) -> PipelineResult<()> {
        let ready: Vec<usize> = {
            let mut state = self.shared.state.lock();
            if state.phase != Phase::Building {
                return Err(PipelineError::AlreadyStarted);
            }
            if state.remaining == 0 {
                state.phase = Phase::Finished;
                tracing::info!("pipeline started with an empty graph");
                return Ok(());
            }
            state.phase = Phase::Running;
            (0..state.entries.len())
                .filter(|&index| state.pending[index] == 0)
                .collect()
        };

        let workers = self.shared.config.worker_count();
        let pool = WorkerPool::spawn(workers, &self.shared);
        for &index in &ready {
            pool.submit(index);
        }
        tracing::info!(
            "pipeline started: {} entries, {} ready, {} workers",
            self.entry_count(),
            ready.len(),
            pool.len()
        );
        *self.pool.lock() = Some(pool);
        Ok(())
    }

    /// Whether `start` has been called since construction or the last reset.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.shared.state.lock().phase != Phase::Building
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    /// Status of an entry.
    #[must_use]
    pub fn status(&self, index: usize) -> Option<EntryStatus> {
        let entry = self.shared.state.lock().entries.get(index).map(Arc::clone)?;
        Some(entry.status())
    }

    /// Blocks until the latest producer of each grid completes and returns
    /// the snapshots in request order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotStarted`] before `start`,
    /// [`PipelineError::UnknownGrid`] for untracked ids and
    /// [`PipelineError::Aborted`] when a producer will never complete.
    pub fn await_grids(&self, ids: &[GridId]) -> PipelineResult<Vec<SharedSnapshot>> {
        enum Target {
            Ready(SharedSnapshot),
            Pending(Arc<Entry>),
        }

        let targets = {
            let state = self.shared.state.lock();
            if state.phase == Phase::Building {
                return Err(PipelineError::NotStarted);
            }
            ids.iter()
                .map(|&id| {
                    let record = state.record(id)?;
                    match (record.last_producer, &record.root) {
                        (Some(producer), _) => {
                            Ok(Target::Pending(Arc::clone(&state.entries[producer])))
                        }
                        (None, Some(root)) => Ok(Target::Ready(SharedSnapshot::clone(root))),
                        (None, None) => Err(PipelineError::NoProducer(id)),
                    }
                })
                .collect::<PipelineResult<Vec<_>>>()?
        };

        targets
            .into_iter()
            .map(|target| match target {
                Target::Ready(snapshot) => Ok(snapshot),
                Target::Pending(entry) => match entry.wait() {
                    EntryStatus::Completed(snapshot) => Ok(snapshot),
                    _ => Err(self.shared.aborted_error()),
                },
            })
            .collect()
    }

    /// Blocks until the graph drains or the run aborts.
    ///
    /// Writes the determinism log when `hash_log_path` is configured; a
    /// write failure is logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotStarted`] before `start` and
    /// [`PipelineError::Aborted`] after a node failure.
    pub fn join(&self) -> PipelineResult<()> {
        let failure = {
            let mut state = self.shared.state.lock();
            if state.phase == Phase::Building {
                return Err(PipelineError::NotStarted);
            }
            while state.phase != Phase::Finished {
                self.shared.progress.wait(&mut state);
            }
            state.failure.clone()
        };

        if let Some(path) = &self.shared.config.hash_log_path {
            if let Err(error) = self.write_determinism_log(path) {
                tracing::warn!("failed to write determinism log to {}: {error}", path.display());
            }
        }

        match failure {
            Some(failure) => Err(PipelineError::Aborted { failure }),
            None => Ok(()),
        }
    }

    /// Drops every entry, promotes each grid's latest completed snapshot to
    /// its initial state and reopens the graph for `add`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StillRunning`] if the graph has not drained.
    pub fn reset(&self) -> PipelineResult<()> {
        if self.shared.state.lock().phase == Phase::Running {
            return Err(PipelineError::StillRunning);
        }
        if let Some(pool) = self.pool.lock().take() {
            pool.shutdown();
        }

        let mut state = self.shared.state.lock();
        let GraphState { entries, grids, .. } = &mut *state;
        for record in grids.values_mut() {
            if let Some(producer) = record.last_producer.take() {
                if let Some(snapshot) = entries[producer].snapshot() {
                    record.root = Some(snapshot);
                }
            }
        }
        state.sequence_base += state.entries.len();
        state.entries.clear();
        state.pending.clear();
        state.dependants.clear();
        state.remaining = 0;
        state.failure = None;
        state.phase = Phase::Building;
        self.shared.aborted.store(false, Ordering::Release);
        tracing::debug!("pipeline reset");
        Ok(())
    }

    /// Determinism log lines recorded so far, in declaration order.
    #[must_use]
    pub fn determinism_lines(&self) -> Vec<String> {
        self.shared.log.lock().lines()
    }

    /// Writes the determinism log to `path`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_determinism_log(&self, path: &Path) -> io::Result<()> {
        self.shared.log.lock().write_file(path)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        let running = self.shared.state.lock().phase == Phase::Running;
        if running {
            self.shared.abort(None);
        }
        if let Some(pool) = self.pool.lock().take() {
            pool.shutdown();
        }
    }
}
