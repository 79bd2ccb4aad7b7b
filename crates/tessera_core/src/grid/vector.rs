//! Vector field operations.
//!
//! Vectors change direction under reflection, so these operations never
//! propagate cell values between symmetric counterparts.

use super::float::central_difference;
use super::{FloatGrid, VectorGrid};
use crate::error::GridResult;
use crate::math::Vector2;

impl VectorGrid {
    /// Per-cell gradient vector of a scalar field.
    #[must_use]
    pub fn from_gradient(source: &FloatGrid) -> Self {
        let size = source.size();
        let mut grid = source.map_into(|_| Vector2::ZERO);
        let field = source.cells();
        for (index, cell) in grid.cells_mut().iter_mut().enumerate() {
            let (dx, dy) = central_difference(field, size, index % size, index / size);
            *cell = Vector2::new(dx, dy);
        }
        grid
    }

    /// Scales every vector to unit length; zero vectors stay zero.
    pub fn normalize(&mut self) {
        for cell in self.cells_mut() {
            *cell = cell.normalized();
        }
    }

    /// Multiplies every vector by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for cell in self.cells_mut() {
            *cell = *cell * factor;
        }
    }

    /// Cellwise sum.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GridError::SymmetryMismatch`] for differing settings.
    pub fn add(&mut self, other: &Self) -> GridResult<()> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Length of every vector.
    #[must_use]
    pub fn magnitude(&self) -> FloatGrid {
        self.map_into(Vector2::length)
    }
}
