//! # Grid Error Types
//!
//! All configuration errors that can occur while building or combining grids.
//! These are raised synchronously at the call site, never deferred.

use thiserror::Error;

use crate::symmetry::{Symmetry, SymmetrySettings};

/// Errors that can occur in the grid system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// A point symmetry was requested with an unsupported fold count.
    #[error("unsupported point symmetry: {0} points (expected 2..=16)")]
    UnsupportedPointCount(u8),

    /// Team or spawn symmetry does not evenly divide the terrain symmetry.
    #[error("{role} symmetry {symmetry:?} ({points} points) does not divide terrain symmetry {terrain:?} ({terrain_points} points)")]
    InvalidSymmetry {
        /// Which class failed the check ("team" or "spawn").
        role: &'static str,
        /// The offending symmetry.
        symmetry: Symmetry,
        /// Its point count.
        points: u8,
        /// The terrain symmetry it was checked against.
        terrain: Symmetry,
        /// The terrain point count.
        terrain_points: u8,
    },

    /// Two grids in a binary operation carry different symmetry settings.
    #[error("symmetry mismatch: {left:?} vs {right:?}")]
    SymmetryMismatch {
        /// Settings of the grid being mutated.
        left: SymmetrySettings,
        /// Settings of the operand.
        right: SymmetrySettings,
    },

    /// Grid size is zero or otherwise unusable.
    #[error("invalid grid size: {0}")]
    InvalidSize(usize),

    /// A numeric parameter is outside its valid range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl GridError {
    /// Shorthand for an [`GridError::InvalidParameter`].
    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type for grid operations.
pub type GridResult<T> = Result<T, GridError>;
