//! # Pipeline Error Types
//!
//! Protocol errors surface synchronously from the call that caused them.
//! Execution errors are raised inside a node, abort the run and surface from
//! `join` / `await_grids` as [`PipelineError::Aborted`].

use std::fmt;
use std::panic::Location;
use std::path::PathBuf;

use thiserror::Error;

use tessera_core::GridError;

use crate::snapshot::{GridId, GridKind};

/// Errors returned by pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// `add` or `track` after `start`.
    #[error("pipeline already started; the graph is frozen")]
    AlreadyStarted,

    /// `await_grids` or `join` before `start`.
    #[error("pipeline not started")]
    NotStarted,

    /// `reset` while nodes are still pending.
    #[error("pipeline still running; join before reset")]
    StillRunning,

    /// Grid id not tracked by this pipeline.
    #[error("unknown grid {0}")]
    UnknownGrid(GridId),

    /// Grid read before anything produced it.
    #[error("grid {0} has no initial state and no producer")]
    NoProducer(GridId),

    /// A grid was used as the wrong element type.
    #[error("grid {grid} is a {actual} grid, expected {expected}")]
    TypeMismatch {
        /// The grid.
        grid: GridId,
        /// Kind the caller asked for.
        expected: GridKind,
        /// Kind it actually has.
        actual: GridKind,
    },

    /// Configuration error caught at declaration time.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Registry lookup failed.
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    /// Operation called with the wrong number of parameters or sources.
    #[error("operation `{operation}` expects {expected} {what}, got {actual}")]
    Arity {
        /// Operation id.
        operation: String,
        /// "parameters" or "sources".
        what: &'static str,
        /// Expected count.
        expected: usize,
        /// Supplied count.
        actual: usize,
    },

    /// Malformed graph description.
    #[error("invalid graph description: {0}")]
    Description(String),

    /// TOML could not be parsed.
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A node failed and the run was abandoned.
    #[error("pipeline aborted: {failure}")]
    Aborted {
        /// The first node failure.
        failure: NodeFailure,
    },

    /// The run was cancelled before the awaited node completed.
    #[error("pipeline cancelled")]
    Cancelled,

    /// Reading a config or description file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error produced inside a running node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    /// The grid operation rejected its input.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// The task panicked.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// An input snapshot had an unexpected element type.
    #[error("input `{name}` is a {actual} grid, expected {expected}")]
    TypeMismatch {
        /// Debug name of the input.
        name: String,
        /// Kind the task expected.
        expected: GridKind,
        /// Kind it received.
        actual: GridKind,
    },

    /// A producer finished without publishing the input this node reads.
    #[error("input `{0}` was never produced")]
    MissingInput(String),

    /// Task received a different number of inputs than it was built for.
    #[error("expected {expected} inputs, received {actual}")]
    InputCount {
        /// Inputs the task needs.
        expected: usize,
        /// Inputs it was given.
        actual: usize,
    },
}

/// Full context of the node that brought a pipeline down.
#[derive(Clone, Debug)]
pub struct NodeFailure {
    /// Entry index.
    pub index: usize,
    /// Name of the grid the node was producing.
    pub grid: String,
    /// Calling method.
    pub method: String,
    /// Where the node was declared.
    pub location: &'static Location<'static>,
    /// Dependency grid names as declared.
    pub declared: Vec<String>,
    /// Debug names of the snapshots the task actually received.
    pub received: Vec<String>,
    /// What went wrong.
    pub error: NodeError,
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {} ({}.{} at {}) failed: {}",
            self.index, self.grid, self.method, self.location, self.error
        )
    }
}
