//! Canonical iteration bounds.
//!
//! ```text
//!   m = floor(N / 2), c = ceil(N / 2)
//!
//!   None          x in [0, N)   y in [0, N)
//!   Point(2)      x in [0, N)   y in [0, m + 1) if N odd and x <= m, else [0, m)
//!   Point(4)      x in [0, c)   y in [0, m + 1) if N odd and x == m, else [0, m)
//!   Point(k)      angular wedge 0 <= θ < 2π/k around the center
//!   MirrorX       x in [0, c)   y in [0, N)
//!   MirrorZ       x in [0, N)   y in [0, c)
//!   MirrorXZ      x in [0, N)   y in [x, N)
//!   MirrorZX      x in [0, N)   y in [0, N - x)
//!   Quad          x in [0, c)   y in [0, c)
//!   DiagonalQuad  x in [0, c)   y in [x, N - x)
//! ```
//!
//! Upper bounds are exclusive so cells on an axis belong to exactly one side.

use std::ops::Range;

use super::{Symmetry, MAX_POINT_COUNT};

/// Angular slack for cells sitting exactly on a wedge boundary.
const WEDGE_EPSILON: f64 = 1e-9;

/// Minimal cell subset from which every other cell derives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalRegion {
    /// Row range per column; empty outside `[min_x, max_x)`.
    columns: Vec<Range<usize>>,
    min_x: usize,
    max_x: usize,
}

impl CanonicalRegion {
    /// Computes the canonical region of `symmetry` on a `size` x `size` grid.
    #[must_use]
    pub fn new(symmetry: Symmetry, size: usize) -> Self {
        let m = size / 2;
        let c = size - m;
        let odd = size % 2 == 1;

        let columns: Vec<Range<usize>> = (0..size)
            .map(|x| match symmetry {
                Symmetry::None => 0..size,
                Symmetry::Point(2) => {
                    if odd && x <= m {
                        0..m + 1
                    } else {
                        0..m
                    }
                }
                Symmetry::Point(4) => {
                    if x >= c {
                        0..0
                    } else if odd && x == m {
                        0..m + 1
                    } else {
                        0..m
                    }
                }
                Symmetry::Point(k) if (3..=MAX_POINT_COUNT).contains(&k) => wedge_column(x, size, k),
                Symmetry::Point(_) => 0..size,
                Symmetry::MirrorX => {
                    if x < c {
                        0..size
                    } else {
                        0..0
                    }
                }
                Symmetry::MirrorZ => 0..c,
                Symmetry::MirrorXZ => x..size,
                Symmetry::MirrorZX => 0..size - x,
                Symmetry::Quad => {
                    if x < c {
                        0..c
                    } else {
                        0..0
                    }
                }
                Symmetry::DiagonalQuad => {
                    if x < c {
                        x..size - x
                    } else {
                        0..0
                    }
                }
            })
            .collect();

        let min_x = columns.iter().position(|r| !r.is_empty()).unwrap_or(0);
        let max_x = columns.iter().rposition(|r| !r.is_empty()).map_or(0, |x| x + 1);

        Self {
            columns,
            min_x,
            max_x,
        }
    }

    /// First column holding canonical cells.
    #[inline]
    #[must_use]
    pub const fn min_x(&self) -> usize {
        self.min_x
    }

    /// One past the last column holding canonical cells.
    #[inline]
    #[must_use]
    pub const fn max_x(&self) -> usize {
        self.max_x
    }

    /// First canonical row of column `x`.
    #[inline]
    #[must_use]
    pub fn min_y(&self, x: usize) -> usize {
        self.columns.get(x).map_or(0, |r| r.start)
    }

    /// One past the last canonical row of column `x`.
    #[inline]
    #[must_use]
    pub fn max_y(&self, x: usize) -> usize {
        self.columns.get(x).map_or(0, |r| r.end)
    }

    /// Whether `(x, y)` is canonical.
    #[inline]
    #[must_use]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.columns.get(x).is_some_and(|r| r.contains(&y))
    }

    /// Canonical cells, column by column.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.min_x..self.max_x).flat_map(move |x| self.columns[x].clone().map(move |y| (x, y)))
    }

    /// Number of canonical cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.columns.iter().map(ExactSizeIterator::len).sum()
    }
}

/// Rows of column `x` whose cell centers fall in the wedge `[0, 2π/k)`.
///
/// The wedge is convex for k >= 3, so the rows form one contiguous run.
fn wedge_column(x: usize, size: usize, k: u8) -> Range<usize> {
    #[allow(clippy::cast_precision_loss)]
    let center = (size as f64 - 1.0) / 2.0;
    let wedge = std::f64::consts::TAU / f64::from(k);

    let inside = |y: usize| {
        #[allow(clippy::cast_precision_loss)]
        let (dx, dy) = (x as f64 - center, y as f64 - center);
        if dx.abs() < WEDGE_EPSILON && dy.abs() < WEDGE_EPSILON {
            return true;
        }
        let theta = dy.atan2(dx).rem_euclid(std::f64::consts::TAU);
        theta < wedge - WEDGE_EPSILON
    };

    match (0..size).position(inside) {
        Some(start) => {
            let end = (start..size).find(|&y| !inside(y)).unwrap_or(size);
            start..end
        }
        None => 0..0,
    }
}
