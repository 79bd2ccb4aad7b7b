//! Scalar field operations.

use rand::Rng;

use super::{check_non_negative, disc_offsets, for_each_band, offset_cell};
use super::{BooleanGrid, FloatGrid};
use crate::error::{GridError, GridResult};
use crate::symmetry::SymmetryType;

impl FloatGrid {
    /// Maps a mask to `high` where set and `low` elsewhere.
    #[must_use]
    pub fn from_boolean(source: &BooleanGrid, low: f32, high: f32) -> Self {
        source.map_into(|v| if v { high } else { low })
    }

    /// Cells at or above `threshold` become true.
    #[must_use]
    pub fn to_boolean(&self, threshold: f32) -> BooleanGrid {
        BooleanGrid::from_threshold(self, threshold)
    }

    /// Cellwise sum.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SymmetryMismatch`] for differing settings.
    pub fn add(&mut self, other: &Self) -> GridResult<()> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Cellwise difference.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SymmetryMismatch`] for differing settings.
    pub fn subtract(&mut self, other: &Self) -> GridResult<()> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Cellwise product.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SymmetryMismatch`] for differing settings.
    pub fn multiply(&mut self, other: &Self) -> GridResult<()> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Adds `value` to every cell.
    pub fn add_scalar(&mut self, value: f32) {
        for cell in self.cells_mut() {
            *cell += value;
        }
    }

    /// Multiplies every cell by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for cell in self.cells_mut() {
            *cell *= factor;
        }
    }

    /// Clamps every cell into `[min, max]`.
    ///
    /// # Errors
    ///
    /// Rejects `min > max` or NaN bounds.
    pub fn clamp(&mut self, min: f32, max: f32) -> GridResult<()> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(GridError::parameter("clamp", format!("empty range [{min}, {max}]")));
        }
        for cell in self.cells_mut() {
            *cell = cell.clamp(min, max);
        }
        Ok(())
    }

    /// Adds uniform noise in `[-amplitude, amplitude)` to canonical cells,
    /// then propagates.
    ///
    /// # Errors
    ///
    /// Rejects a negative or non-finite amplitude.
    pub fn add_white_noise(&mut self, amplitude: f32, symmetry_type: SymmetryType) -> GridResult<()> {
        check_non_negative("amplitude", amplitude)?;
        let resolver = self.resolver(symmetry_type);
        for (x, y) in resolver.region().cells() {
            let noise = (self.rng_mut().gen::<f32>() * 2.0 - 1.0) * amplitude;
            let value = self.get(x, y) + noise;
            self.set(x, y, value);
        }
        self.propagate(&resolver);
        Ok(())
    }

    /// Mean over the disc of `radius`.
    ///
    /// With a `limiter`, only cells set in the limiter are rewritten.
    ///
    /// # Errors
    ///
    /// Rejects a negative radius. A limiter with other symmetry settings is a
    /// [`GridError::SymmetryMismatch`]; one of another size is resized first.
    pub fn smooth(&mut self, radius: f32, limiter: Option<&BooleanGrid>) -> GridResult<()> {
        check_non_negative("radius", radius)?;
        let limiter = match limiter {
            Some(limiter) if limiter.symmetry_settings() != self.symmetry_settings() => {
                return Err(GridError::SymmetryMismatch {
                    left: *self.symmetry_settings(),
                    right: *limiter.symmetry_settings(),
                });
            }
            Some(limiter) if limiter.size() != self.size() => Some(limiter.resized(self.size())?),
            Some(limiter) => Some(limiter.clone()),
            None => None,
        };

        let offsets = disc_offsets(radius);
        let size = self.size();
        let before = self.cells().to_vec();
        let limiter = limiter.as_ref();
        for_each_band(self.cells_mut(), size, |_, first_row, rows| {
            for (i, row) in rows.chunks_mut(size).enumerate() {
                let y = first_row + i;
                for (x, cell) in row.iter_mut().enumerate() {
                    if limiter.is_some_and(|l| !l.get(x, y)) {
                        continue;
                    }
                    let (mut sum, mut count) = (0.0_f32, 0_u32);
                    for &offset in &offsets {
                        if let Some((nx, ny)) = offset_cell(x, y, offset, size) {
                            sum += before[ny * size + nx];
                            count += 1;
                        }
                    }
                    #[allow(clippy::cast_precision_loss)]
                    let mean = sum / count as f32;
                    *cell = mean;
                }
            }
        });
        self.apply_symmetry(SymmetryType::Terrain);
        Ok(())
    }

    /// Replaces the field by its slope magnitude (central differences,
    /// one-sided at the border).
    pub fn gradient(&mut self) {
        let size = self.size();
        let before = self.cells().to_vec();
        for_each_band(self.cells_mut(), size, |_, first_row, rows| {
            for (i, row) in rows.chunks_mut(size).enumerate() {
                let y = first_row + i;
                for (x, cell) in row.iter_mut().enumerate() {
                    let (dx, dy) = central_difference(&before, size, x, y);
                    *cell = dx.hypot(dy);
                }
            }
        });
        self.apply_symmetry(SymmetryType::Terrain);
    }

    /// Smallest cell value.
    #[must_use]
    pub fn min(&self) -> f32 {
        self.cells().iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Largest cell value.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.cells().iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Sum of all cells.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sum(&self) -> f32 {
        // f64 accumulator, large grids drift otherwise
        let total = self.cells().iter().map(|&v| f64::from(v)).sum::<f64>();
        total as f32
    }

    /// Mean cell value.
    #[must_use]
    pub fn average(&self) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let cells = self.cells().len() as f32;
        self.sum() / cells
    }
}

/// Partial derivatives at `(x, y)` of a row-major `size` field.
pub(crate) fn central_difference(field: &[f32], size: usize, x: usize, y: usize) -> (f32, f32) {
    let at = |x: usize, y: usize| field[y * size + x];
    let (x0, x1) = (x.saturating_sub(1), (x + 1).min(size - 1));
    let (y0, y1) = (y.saturating_sub(1), (y + 1).min(size - 1));
    #[allow(clippy::cast_precision_loss)]
    let dx = if x1 > x0 { (at(x1, y) - at(x0, y)) / (x1 - x0) as f32 } else { 0.0 };
    #[allow(clippy::cast_precision_loss)]
    let dy = if y1 > y0 { (at(x, y1) - at(x, y0)) / (y1 - y0) as f32 } else { 0.0 };
    (dx, dy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::GridSeed;
    use crate::symmetry::{Symmetry, SymmetrySettings};

    fn field(size: usize, symmetry: Symmetry) -> FloatGrid {
        let settings = SymmetrySettings::uniform(symmetry).unwrap();
        FloatGrid::new(size, GridSeed::new(21), settings, "field").unwrap()
    }

    #[test]
    fn test_gradient_of_ramp_is_constant() {
        let mut grid = field(8, Symmetry::None);
        for y in 0..8 {
            for x in 0..8 {
                grid.set(x, y, 2.0 * x as f32);
            }
        }
        grid.gradient();
        assert!(grid.cells().iter().all(|&v| (v - 2.0).abs() < 1e-6));
    }

    #[test]
    fn test_reductions() {
        let mut grid = field(4, Symmetry::None);
        grid.set(0, 0, -3.0);
        grid.set(3, 3, 5.0);
        assert_eq!(grid.min(), -3.0);
        assert_eq!(grid.max(), 5.0);
        assert!((grid.sum() - 2.0).abs() < 1e-6);
        assert!((grid.average() - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_rejects_empty_range() {
        let mut grid = field(4, Symmetry::None);
        assert!(grid.clamp(1.0, 0.0).is_err());
        grid.add_scalar(3.0);
        grid.clamp(0.0, 1.0).unwrap();
        assert_eq!(grid.max(), 1.0);
    }

    #[test]
    fn test_smooth_respects_limiter() {
        let mut grid = field(8, Symmetry::None);
        grid.set(4, 4, 5.0);
        let settings = *grid.symmetry_settings();
        let mut limiter = BooleanGrid::new(8, GridSeed::new(1), settings, "limiter").unwrap();
        limiter.set(4, 4, true);
        grid.smooth(1.0, Some(&limiter)).unwrap();
        assert!((grid.get(4, 4) - 1.0).abs() < 1e-6);
        assert_eq!(grid.get(4, 5), 0.0);
    }

    #[test]
    fn test_white_noise_keeps_symmetry() {
        let mut grid = field(24, Symmetry::DiagonalQuad);
        grid.add_white_noise(0.5, SymmetryType::Terrain).unwrap();
        assert!(grid.is_symmetric(SymmetryType::Terrain));
        assert!(grid.max() <= 0.5 && grid.min() >= -0.5);
        assert!(grid.max() > 0.0);
    }

    #[test]
    fn test_arithmetic() {
        let mut a = field(4, Symmetry::None);
        let mut b = field(4, Symmetry::None);
        a.add_scalar(2.0);
        b.add_scalar(3.0);
        a.multiply(&b).unwrap();
        assert_eq!(a.get(1, 1), 6.0);
        a.subtract(&b).unwrap();
        a.add(&b).unwrap();
        a.scale(0.5);
        assert_eq!(a.get(2, 3), 3.0);
    }
}
