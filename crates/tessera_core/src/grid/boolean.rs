//! Boolean mask operations.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{check_non_negative, check_unit, disc_offsets, for_each_band, offset_cell};
use super::{BooleanGrid, FloatGrid};
use crate::error::GridResult;
use crate::seed::GridSeed;
use crate::symmetry::SymmetryType;

/// 4-neighbourhood used by erosion.
const NEIGHBOURS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

impl BooleanGrid {
    /// Thresholds a scalar grid: `value >= threshold` becomes true.
    #[must_use]
    pub fn from_threshold(source: &FloatGrid, threshold: f32) -> Self {
        source.map_into(|v| v >= threshold)
    }

    /// Number of set cells.
    #[must_use]
    pub fn count(&self) -> usize {
        self.cells().iter().filter(|&&v| v).count()
    }

    /// Sets each canonical cell with probability `density`, then propagates.
    ///
    /// Canonical cells are visited column by column so a given seed always
    /// produces the same mask.
    ///
    /// # Errors
    ///
    /// Rejects a density outside `[0, 1]`.
    pub fn randomize(&mut self, density: f32, symmetry_type: SymmetryType) -> GridResult<()> {
        check_unit("density", density)?;
        let resolver = self.resolver(symmetry_type);
        for (x, y) in resolver.region().cells() {
            let value = self.rng_mut().gen::<f32>() < density;
            self.set(x, y, value);
        }
        self.propagate(&resolver);
        Ok(())
    }

    /// Clears exposed cells (a set cell with a clear 4-neighbour) with
    /// probability `strength`, `iterations` times.
    ///
    /// Each iteration reads the mask as it was before the iteration started.
    ///
    /// # Errors
    ///
    /// Rejects a strength outside `[0, 1]`.
    pub fn erode(
        &mut self,
        strength: f32,
        symmetry_type: SymmetryType,
        iterations: usize,
    ) -> GridResult<()> {
        check_unit("strength", strength)?;
        let size = self.size();
        for _ in 0..iterations {
            let seeds = self.band_seeds();
            let before = self.cells().to_vec();
            for_each_band(self.cells_mut(), size, |band, first_row, rows| {
                let mut rng = ChaCha8Rng::seed_from_u64(seeds[band]);
                for (i, row) in rows.chunks_mut(size).enumerate() {
                    let y = first_row + i;
                    for (x, cell) in row.iter_mut().enumerate() {
                        if !before[y * size + x] {
                            continue;
                        }
                        let exposed = NEIGHBOURS.iter().any(|&offset| {
                            offset_cell(x, y, offset, size).is_some_and(|(nx, ny)| !before[ny * size + nx])
                        });
                        if exposed && rng.gen::<f32>() < strength {
                            *cell = false;
                        }
                    }
                }
            });
            self.apply_symmetry(symmetry_type);
        }
        Ok(())
    }

    /// Majority filter: a cell is set when the share of set cells inside the
    /// disc of `radius` exceeds `density`.
    ///
    /// # Errors
    ///
    /// Rejects a negative radius or a density outside `[0, 1]`.
    pub fn smooth(&mut self, radius: f32, density: f32) -> GridResult<()> {
        check_non_negative("radius", radius)?;
        check_unit("density", density)?;
        let offsets = disc_offsets(radius);
        self.disc_kernel(&offsets, |set, total| {
            #[allow(clippy::cast_precision_loss)]
            let share = set as f32 / total as f32;
            share > density
        });
        Ok(())
    }

    /// Dilation: a cell is set when any cell within `radius` is set.
    ///
    /// # Errors
    ///
    /// Rejects a negative radius.
    pub fn inflate(&mut self, radius: f32) -> GridResult<()> {
        check_non_negative("radius", radius)?;
        let offsets = disc_offsets(radius);
        self.disc_kernel(&offsets, |set, _| set > 0);
        Ok(())
    }

    /// Erosion by a disc: a cell stays set only when every cell within
    /// `radius` is set. Cells beyond the border do not count.
    ///
    /// # Errors
    ///
    /// Rejects a negative radius.
    pub fn deflate(&mut self, radius: f32) -> GridResult<()> {
        check_non_negative("radius", radius)?;
        let offsets = disc_offsets(radius);
        self.disc_kernel(&offsets, |set, total| set == total);
        Ok(())
    }

    /// Eats random holes of radius `size` into the mask.
    ///
    /// # Errors
    ///
    /// Rejects a strength outside `[0, 1]` or a negative size.
    pub fn acid(&mut self, strength: f32, size: f32) -> GridResult<()> {
        check_unit("strength", strength)?;
        check_non_negative("size", size)?;
        let seed = GridSeed::new(self.rng_mut().gen());
        let mut holes = Self::new(
            self.size(),
            seed,
            *self.symmetry_settings(),
            format!("{}.acid", self.name()),
        )?;
        holes.randomize(strength, SymmetryType::Terrain)?;
        holes.inflate(size)?;
        self.minus(&holes)
    }

    /// Union with `other`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GridError::SymmetryMismatch`] for differing settings.
    pub fn combine(&mut self, other: &Self) -> GridResult<()> {
        self.zip_with(other, |a, b| a || b)
    }

    /// Intersection with `other`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GridError::SymmetryMismatch`] for differing settings.
    pub fn intersect(&mut self, other: &Self) -> GridResult<()> {
        self.zip_with(other, |a, b| a && b)
    }

    /// Removes every cell set in `other`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GridError::SymmetryMismatch`] for differing settings.
    pub fn minus(&mut self, other: &Self) -> GridResult<()> {
        self.zip_with(other, |a, b| a && !b)
    }

    /// Flips every cell.
    pub fn invert(&mut self) {
        for cell in self.cells_mut() {
            *cell = !*cell;
        }
    }

    /// Applies `decide(set, total)` per cell over the disc neighbourhood,
    /// then restores terrain symmetry.
    fn disc_kernel<F>(&mut self, offsets: &[(isize, isize)], decide: F)
    where
        F: Fn(usize, usize) -> bool + Sync,
    {
        let size = self.size();
        let before = self.cells().to_vec();
        for_each_band(self.cells_mut(), size, |_, first_row, rows| {
            for (i, row) in rows.chunks_mut(size).enumerate() {
                let y = first_row + i;
                for (x, cell) in row.iter_mut().enumerate() {
                    let (mut set, mut total) = (0, 0);
                    for &offset in offsets {
                        if let Some((nx, ny)) = offset_cell(x, y, offset, size) {
                            total += 1;
                            set += usize::from(before[ny * size + nx]);
                        }
                    }
                    *cell = decide(set, total);
                }
            }
        });
        self.apply_symmetry(SymmetryType::Terrain);
    }
}
