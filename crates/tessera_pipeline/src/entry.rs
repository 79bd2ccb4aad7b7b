//! Pipeline entries and their completion signal.

use std::fmt;
use std::panic::Location;

use parking_lot::{Condvar, Mutex};

use crate::error::NodeError;
use crate::snapshot::{GridId, GridKind, SharedSnapshot};

/// Deferred computation of one node.
pub type NodeTask = Box<dyn FnOnce(&[SharedSnapshot]) -> Result<SharedSnapshot, NodeError> + Send>;

/// Lifecycle of an entry.
#[derive(Clone)]
pub enum EntryStatus {
    /// Recorded, waiting for `start` or for its dependencies.
    Declared,
    /// Picked up by a worker.
    Running,
    /// Finished; the snapshot is retained until reset.
    Completed(SharedSnapshot),
    /// The task returned an error or panicked.
    Failed,
    /// Discarded because another node failed.
    Aborted,
}

impl EntryStatus {
    /// Completed, failed or aborted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed | Self::Aborted)
    }
}

impl fmt::Debug for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared => f.write_str("Declared"),
            Self::Running => f.write_str("Running"),
            Self::Completed(snapshot) => write!(f, "Completed({})", snapshot.debug_name()),
            Self::Failed => f.write_str("Failed"),
            Self::Aborted => f.write_str("Aborted"),
        }
    }
}

/// Where a dependency's value comes from.
#[derive(Clone)]
pub(crate) enum Source {
    /// Output of an earlier entry.
    Entry(usize),
    /// Initial state of a grid nobody has produced yet.
    Root(SharedSnapshot),
}

/// One declared input of an entry.
#[derive(Clone)]
pub(crate) struct Dependency {
    pub name: String,
    pub source: Source,
}

struct Slot {
    status: EntryStatus,
    task: Option<NodeTask>,
}

/// One recorded grid-producing call.
pub(crate) struct Entry {
    pub index: usize,
    pub executing: GridId,
    pub result: GridId,
    pub result_name: String,
    pub result_kind: GridKind,
    pub dependencies: Vec<Dependency>,
    pub method: String,
    pub location: &'static Location<'static>,
    slot: Mutex<Slot>,
    done: Condvar,
}

impl Entry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: usize,
        executing: GridId,
        result: GridId,
        result_name: String,
        result_kind: GridKind,
        dependencies: Vec<Dependency>,
        method: String,
        location: &'static Location<'static>,
        task: NodeTask,
    ) -> Self {
        Self {
            index,
            executing,
            result,
            result_name,
            result_kind,
            dependencies,
            method,
            location,
            slot: Mutex::new(Slot {
                status: EntryStatus::Declared,
                task: Some(task),
            }),
            done: Condvar::new(),
        }
    }

    /// Current status.
    pub fn status(&self) -> EntryStatus {
        self.slot.lock().status.clone()
    }

    /// Snapshot, if completed.
    pub fn snapshot(&self) -> Option<SharedSnapshot> {
        match &self.slot.lock().status {
            EntryStatus::Completed(snapshot) => Some(SharedSnapshot::clone(snapshot)),
            _ => None,
        }
    }

    /// Moves a declared entry to running and hands out its task.
    pub fn begin(&self) -> Option<NodeTask> {
        let mut slot = self.slot.lock();
        if !matches!(slot.status, EntryStatus::Declared) {
            return None;
        }
        slot.status = EntryStatus::Running;
        slot.task.take()
    }

    /// Publishes the result unless the entry was aborted meanwhile.
    pub fn complete(&self, snapshot: SharedSnapshot) -> bool {
        self.finish(EntryStatus::Completed(snapshot))
    }

    /// Marks a running entry failed.
    pub fn fail(&self) -> bool {
        self.finish(EntryStatus::Failed)
    }

    /// Discards a non-terminal entry.
    pub fn abort(&self) -> bool {
        let mut slot = self.slot.lock();
        if slot.status.is_terminal() {
            return false;
        }
        slot.status = EntryStatus::Aborted;
        slot.task = None;
        self.done.notify_all();
        true
    }

    fn finish(&self, status: EntryStatus) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(slot.status, EntryStatus::Running) {
            return false;
        }
        slot.status = status;
        self.done.notify_all();
        true
    }

    /// Blocks until the entry reaches a terminal state.
    pub fn wait(&self) -> EntryStatus {
        let mut slot = self.slot.lock();
        while !slot.status.is_terminal() {
            self.done.wait(&mut slot);
        }
        slot.status.clone()
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("index", &self.index)
            .field("executing", &self.executing)
            .field("result", &self.result)
            .field("method", &self.method)
            .field("location", &format_args!("{}", self.location))
            .finish_non_exhaustive()
    }
}
