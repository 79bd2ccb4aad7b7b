//! # Grid Family
//!
//! Square, row-major buffers (`index = y * size + x`) carrying symmetry
//! settings, a seeded PRNG and a debug name.
//!
//! ## Symmetry Discipline
//!
//! Symmetry-aware operations write the canonical region (or the whole grid)
//! and then pull every non-canonical cell from its canonical source. After
//! such an operation `get(x, y) == get(source(x, y))` holds for every cell.
//! Constant fills are exempt: they write exactly the cells they cover.
//!
//! ## Element Types
//!
//! | Alias         | Cell      |
//! |---------------|-----------|
//! | `BooleanGrid` | `bool`    |
//! | `FloatGrid`   | `f32`     |
//! | `VectorGrid`  | `Vector2` |

mod bands;
mod boolean;
mod float;
mod vector;

use std::fmt;
use std::hash::Hasher;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use siphasher::sip::SipHasher24;

use crate::error::{GridError, GridResult};
use crate::math::Vector2;
use crate::seed::GridSeed;
use crate::symmetry::{SymmetryResolver, SymmetrySettings, SymmetryType};

pub(crate) use bands::{disc_offsets, for_each_band, offset_cell};

/// Fixed SipHash keys; content hashes must be stable across processes.
const HASH_KEYS: (u64, u64) = (0x7465_7373_6572_6100, 0x6d61_736b_6861_7368);

/// Element stored in a grid.
pub trait Cell: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Feeds the cell's exact bit pattern into `hasher`.
    fn write_hash<H: Hasher>(&self, hasher: &mut H);
}

impl Cell for bool {
    #[inline]
    fn write_hash<H: Hasher>(&self, hasher: &mut H) {
        hasher.write_u8(u8::from(*self));
    }
}

impl Cell for f32 {
    #[inline]
    fn write_hash<H: Hasher>(&self, hasher: &mut H) {
        hasher.write_u32(self.to_bits());
    }
}

impl Cell for Vector2 {
    #[inline]
    fn write_hash<H: Hasher>(&self, hasher: &mut H) {
        hasher.write(bytemuck::bytes_of(self));
    }
}

/// Symmetry-aware square grid.
#[derive(Clone)]
pub struct Grid<T: Cell> {
    size: usize,
    cells: Vec<T>,
    settings: SymmetrySettings,
    rng: ChaCha8Rng,
    name: String,
}

/// Grid of booleans (the classic "mask").
pub type BooleanGrid = Grid<bool>;

/// Grid of scalars (heightmaps, densities).
pub type FloatGrid = Grid<f32>;

/// Grid of 2D vectors (gradients, flow).
pub type VectorGrid = Grid<Vector2>;

impl<T: Cell> Grid<T> {
    /// Creates a grid filled with `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidSize`] for a zero size.
    pub fn new(
        size: usize,
        seed: GridSeed,
        settings: SymmetrySettings,
        name: impl Into<String>,
    ) -> GridResult<Self> {
        if size == 0 {
            return Err(GridError::InvalidSize(size));
        }
        Ok(Self {
            size,
            cells: vec![T::default(); size * size],
            settings,
            rng: seed.rng(),
            name: name.into(),
        })
    }

    /// Side length.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Debug name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the grid.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Symmetry settings.
    #[inline]
    #[must_use]
    pub const fn symmetry_settings(&self) -> &SymmetrySettings {
        &self.settings
    }

    /// Raw cells in row-major order.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    #[inline]
    const fn index(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    /// Returns the cell at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the grid.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> T {
        assert!(x < self.size && y < self.size, "({x}, {y}) outside {}", self.size);
        self.cells[self.index(x, y)]
    }

    /// Writes a single cell. No symmetry is applied.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the grid.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        assert!(x < self.size && y < self.size, "({x}, {y}) outside {}", self.size);
        let index = self.index(x, y);
        self.cells[index] = value;
    }

    /// Returns the cell at `(x, y)` if it lies inside the grid.
    #[inline]
    #[must_use]
    pub fn try_get(&self, x: isize, y: isize) -> Option<T> {
        let (x, y) = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
        (x < self.size && y < self.size).then(|| self.cells[self.index(x, y)])
    }

    /// Sets every cell to `value`.
    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }

    /// Copy of this grid under a new name.
    #[must_use]
    pub fn copy_as(&self, name: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.name = name.into();
        copy
    }

    /// Builds a grid of another cell type with the same size, settings,
    /// PRNG state and name.
    pub(crate) fn map_into<U: Cell>(&self, f: impl Fn(T) -> U) -> Grid<U> {
        Grid {
            size: self.size,
            cells: self.cells.iter().map(|&v| f(v)).collect(),
            settings: self.settings,
            rng: self.rng.clone(),
            name: self.name.clone(),
        }
    }

    /// Resolver for the selected symmetry class at this grid's size.
    #[must_use]
    pub fn resolver(&self, symmetry_type: SymmetryType) -> SymmetryResolver {
        SymmetryResolver::new(self.settings.symmetry(symmetry_type), self.size)
    }

    /// Copies every canonical value onto its symmetric counterparts.
    pub fn apply_symmetry(&mut self, symmetry_type: SymmetryType) {
        let resolver = self.resolver(symmetry_type);
        self.propagate(&resolver);
    }

    pub(crate) fn propagate(&mut self, resolver: &SymmetryResolver) {
        debug_assert_eq!(resolver.size(), self.size);
        let region = resolver.region();
        for y in 0..self.size {
            for x in 0..self.size {
                if region.contains(x, y) {
                    continue;
                }
                if let Some((sx, sy)) = resolver.source(x, y) {
                    let value = self.cells[self.index(sx, sy)];
                    let index = self.index(x, y);
                    self.cells[index] = value;
                }
            }
        }
    }

    /// Whether every cell equals its source, and so every counterpart.
    #[must_use]
    pub fn is_symmetric(&self, symmetry_type: SymmetryType) -> bool {
        let resolver = self.resolver(symmetry_type);
        (0..self.size).all(|y| {
            (0..self.size).all(|x| {
                resolver
                    .source(x, y)
                    .map_or(true, |(sx, sy)| self.get(x, y) == self.get(sx, sy))
            })
        })
    }

    /// Fills a disc with `value`; a cell is covered when its distance to
    /// `center` is at most `radius`.
    pub fn fill_circle(&mut self, center: Vector2, radius: f32, value: T) {
        let radius_sq = radius * radius;
        for y in 0..self.size {
            for x in 0..self.size {
                #[allow(clippy::cast_precision_loss)]
                let cell = Vector2::new(x as f32, y as f32);
                if cell.distance_squared(center) <= radius_sq {
                    let index = self.index(x, y);
                    self.cells[index] = value;
                }
            }
        }
    }

    /// Fills the half-open rectangle `[x, x + width) x [y, y + height)`,
    /// clipped to the grid.
    pub fn fill_rect(&mut self, x: isize, y: isize, width: usize, height: usize, value: T) {
        self.fill_parallelogram(x, y, width, height, 0.0, 0.0, value);
    }

    /// Fills a sheared rectangle.
    ///
    /// Cell `(u, v)` of the `width` x `height` rectangle lands on
    /// `(x + u + round(v * x_slope), y + v + round(u * y_slope))`.
    /// Cells falling outside the grid are skipped.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_parallelogram(
        &mut self,
        x: isize,
        y: isize,
        width: usize,
        height: usize,
        x_slope: f32,
        y_slope: f32,
        value: T,
    ) {
        for v in 0..height {
            for u in 0..width {
                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
                let (shear_x, shear_y) = (
                    (v as f32 * x_slope).round() as isize,
                    (u as f32 * y_slope).round() as isize,
                );
                #[allow(clippy::cast_possible_wrap)]
                let (px, py) = (x + u as isize + shear_x, y + v as isize + shear_y);
                if let (Ok(px), Ok(py)) = (usize::try_from(px), usize::try_from(py)) {
                    if px < self.size && py < self.size {
                        let index = self.index(px, py);
                        self.cells[index] = value;
                    }
                }
            }
        }
    }

    /// Nearest-neighbour rescale to `size` x `size`, then re-applies terrain
    /// symmetry.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidSize`] for a zero size.
    pub fn resize(&mut self, size: usize) -> GridResult<()> {
        if size == 0 {
            return Err(GridError::InvalidSize(size));
        }
        if size == self.size {
            return Ok(());
        }
        let old = self.size;
        let mut cells = Vec::with_capacity(size * size);
        for y in 0..size {
            let sy = y * old / size;
            for x in 0..size {
                let sx = x * old / size;
                cells.push(self.cells[sy * old + sx]);
            }
        }
        self.size = size;
        self.cells = cells;
        self.apply_symmetry(SymmetryType::Terrain);
        Ok(())
    }

    /// Resized copy; see [`Grid::resize`].
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidSize`] for a zero size.
    pub fn resized(&self, size: usize) -> GridResult<Self> {
        let mut copy = self.clone();
        copy.resize(size)?;
        Ok(copy)
    }

    /// Rejects operands whose symmetry settings differ from ours.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SymmetryMismatch`].
    pub fn check_compatible(&self, other: &Self) -> GridResult<()> {
        if self.settings == other.settings {
            Ok(())
        } else {
            Err(GridError::SymmetryMismatch {
                left: self.settings,
                right: other.settings,
            })
        }
    }

    /// Elementwise binary update after resizing the smaller operand.
    pub(crate) fn zip_with(&mut self, other: &Self, f: impl Fn(T, T) -> T) -> GridResult<()> {
        self.check_compatible(other)?;
        if self.size < other.size {
            self.resize(other.size)?;
        }
        let scaled;
        let rhs = if other.size == self.size {
            other
        } else {
            scaled = other.resized(self.size)?;
            &scaled
        };
        for (lhs, &rhs) in self.cells.iter_mut().zip(&rhs.cells) {
            *lhs = f(*lhs, rhs);
        }
        Ok(())
    }

    /// Seeds for per-band generators; drawn from the grid PRNG so results do
    /// not depend on band scheduling.
    pub(crate) fn band_seeds(&mut self) -> [u64; bands::BAND_COUNT] {
        let mut seeds = [0_u64; bands::BAND_COUNT];
        for seed in &mut seeds {
            *seed = self.rng.gen();
        }
        seeds
    }

    pub(crate) fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }

    /// Stable hash of size and cell contents.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        let mut hasher = SipHasher24::new_with_keys(HASH_KEYS.0, HASH_KEYS.1);
        hasher.write_u64(self.size as u64);
        for cell in &self.cells {
            cell.write_hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl<T: Cell> fmt::Debug for Grid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("settings", &self.settings)
            .field("hash", &format_args!("{:016x}", self.content_hash()))
            .finish()
    }
}

fn check_unit(name: &'static str, value: f32) -> GridResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GridError::parameter(name, format!("{value} is outside [0, 1]")))
    }
}

fn check_non_negative(name: &'static str, value: f32) -> GridResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(GridError::parameter(name, format!("{value} must be finite and >= 0")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::Symmetry;

    fn grid(size: usize, symmetry: Symmetry) -> BooleanGrid {
        let settings = SymmetrySettings::uniform(symmetry).unwrap();
        BooleanGrid::new(size, GridSeed::new(1), settings, "test").unwrap()
    }

    #[test]
    fn test_zero_size_rejected() {
        let settings = SymmetrySettings::default();
        assert_eq!(
            FloatGrid::new(0, GridSeed::default(), settings, "empty").unwrap_err(),
            GridError::InvalidSize(0)
        );
    }

    #[test]
    fn test_fill_circle_inclusive_radius() {
        let mut mask = grid(9, Symmetry::None);
        mask.fill_circle(Vector2::new(4.0, 4.0), 2.0, true);
        assert!(mask.get(4, 2));
        assert!(mask.get(6, 4));
        assert!(!mask.get(6, 6));
        assert_eq!(mask.cells().iter().filter(|&&v| v).count(), 13);
    }

    #[test]
    fn test_fill_rect_half_open_and_clipped() {
        let mut mask = grid(8, Symmetry::None);
        mask.fill_rect(6, -1, 4, 3, true);
        assert!(mask.get(6, 0) && mask.get(7, 1));
        assert!(!mask.get(6, 2));
        assert_eq!(mask.cells().iter().filter(|&&v| v).count(), 4);
    }

    #[test]
    fn test_fill_parallelogram_shears() {
        let mut mask = grid(8, Symmetry::None);
        mask.fill_parallelogram(0, 0, 2, 3, 1.0, 0.0, true);
        assert!(mask.get(0, 0) && mask.get(1, 0));
        assert!(mask.get(1, 1) && mask.get(2, 1));
        assert!(mask.get(2, 2) && mask.get(3, 2));
        assert!(!mask.get(0, 1));
    }

    #[test]
    fn test_propagation_pulls_from_canonical() {
        let mut mask = grid(6, Symmetry::MirrorX);
        mask.set(1, 4, true);
        mask.set(5, 0, true);
        mask.apply_symmetry(SymmetryType::Terrain);
        assert!(mask.get(4, 4));
        // (5, 0) is not canonical and gets overwritten by (0, 0)
        assert!(!mask.get(5, 0));
        assert!(mask.is_symmetric(SymmetryType::Terrain));
    }

    #[test]
    fn test_resize_nearest() {
        let mut mask = grid(4, Symmetry::None);
        mask.set(3, 3, true);
        mask.resize(8).unwrap();
        assert_eq!(mask.size(), 8);
        assert!(mask.get(6, 6) && mask.get(7, 7));
        assert!(!mask.get(5, 5));
    }

    #[test]
    fn test_content_hash_tracks_cells() {
        let mut a = grid(16, Symmetry::Point(2));
        let b = a.copy_as("other");
        assert_eq!(a.content_hash(), b.content_hash());
        a.set(0, 0, true);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_try_get_bounds() {
        let mask = grid(4, Symmetry::None);
        assert_eq!(mask.try_get(-1, 0), None);
        assert_eq!(mask.try_get(3, 3), Some(false));
        assert_eq!(mask.try_get(4, 0), None);
    }
}
