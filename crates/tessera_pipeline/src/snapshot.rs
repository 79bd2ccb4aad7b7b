//! Immutable grid snapshots.
//!
//! A node receives its inputs as shared snapshots and returns a new one. A
//! writer never mutates a snapshot: it clones the grid out, mutates the clone
//! and publishes the result as a fresh `Arc`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tessera_core::{Cell, Grid, SymmetrySettings, Vector2};

use crate::error::NodeError;

/// Handle of a grid tracked by one pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridId(pub(crate) u32);

impl GridId {
    /// Raw id.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element type of a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    /// `BooleanGrid`
    Boolean,
    /// `FloatGrid`
    Float,
    /// `VectorGrid`
    Vector,
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Vector => "vector",
        })
    }
}

/// Cell types the pipeline knows how to track.
pub trait KindedCell: Cell {
    /// Kind of a grid of this cell.
    const KIND: GridKind;
}

impl KindedCell for bool {
    const KIND: GridKind = GridKind::Boolean;
}

impl KindedCell for f32 {
    const KIND: GridKind = GridKind::Float;
}

impl KindedCell for Vector2 {
    const KIND: GridKind = GridKind::Vector;
}

/// Type-erased, read-only view of a completed grid.
pub trait GridSnapshot: Any + Send + Sync + fmt::Debug {
    /// Debug name of the grid.
    fn debug_name(&self) -> &str;

    /// Side length.
    fn size(&self) -> usize;

    /// Symmetry settings.
    fn symmetry_settings(&self) -> SymmetrySettings;

    /// Element type.
    fn kind(&self) -> GridKind;

    /// Stable content hash.
    fn content_hash(&self) -> u64;

    /// Borrowed downcast support.
    fn as_any(&self) -> &dyn Any;

    /// Owned downcast support.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Shared snapshot handed between nodes.
pub type SharedSnapshot = Arc<dyn GridSnapshot>;

impl<T: KindedCell> GridSnapshot for Grid<T> {
    fn debug_name(&self) -> &str {
        self.name()
    }

    fn size(&self) -> usize {
        Grid::size(self)
    }

    fn symmetry_settings(&self) -> SymmetrySettings {
        *Grid::symmetry_settings(self)
    }

    fn kind(&self) -> GridKind {
        T::KIND
    }

    fn content_hash(&self) -> u64 {
        Grid::content_hash(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Borrows the concrete grid behind a snapshot.
///
/// # Errors
///
/// Returns [`NodeError::TypeMismatch`] when the element type differs.
pub fn downcast_ref<T: KindedCell>(snapshot: &dyn GridSnapshot) -> Result<&Grid<T>, NodeError> {
    snapshot
        .as_any()
        .downcast_ref::<Grid<T>>()
        .ok_or_else(|| NodeError::TypeMismatch {
            name: snapshot.debug_name().to_owned(),
            expected: T::KIND,
            actual: snapshot.kind(),
        })
}

/// Takes the concrete grid behind a snapshot without copying.
///
/// # Errors
///
/// Returns [`NodeError::TypeMismatch`] when the element type differs.
pub fn downcast_arc<T: KindedCell>(snapshot: SharedSnapshot) -> Result<Arc<Grid<T>>, NodeError> {
    let (name, actual) = (snapshot.debug_name().to_owned(), snapshot.kind());
    snapshot
        .into_any()
        .downcast::<Grid<T>>()
        .map_err(|_| NodeError::TypeMismatch {
            name,
            expected: T::KIND,
            actual,
        })
}

/// Private mutable copy of an input, for a node that writes.
///
/// # Errors
///
/// Returns [`NodeError::TypeMismatch`] when the element type differs.
pub fn clone_grid<T: KindedCell>(snapshot: &dyn GridSnapshot) -> Result<Grid<T>, NodeError> {
    downcast_ref::<T>(snapshot).map(Clone::clone)
}
