//! Cell orbits of the point symmetries whose rotations leave the lattice.
//!
//! Rounded rotations are not a group action on cells: two wedge cells can
//! round onto the same image and some cells have no preimage at all. Orbits
//! partition the grid instead. Every cell gets exactly one owner and the
//! cells sharing an owner are each other's counterparts.
//!
//! ```text
//!   e = 4 if k % 4 == 0, 2 if k is even, 1 otherwise   (exact sub-rotations)
//!   sector        cells at angle [0, 2π/e) from the center, plus the center
//!   sector cell   owner = wedge cell nearest to the cell rotated back by
//!                 i * 2π/k, i = floor(angle / (2π/k))
//!   other cell    owner of its exact quarter/half turn into the sector
//! ```
//!
//! Quarter turns and the antipode therefore map every orbit onto itself.
//! A sector cell whose back-rotation misses the wedge (grid corners) owns
//! its own orbit.

use std::f64::consts::TAU;

use super::region::CanonicalRegion;

/// Owner table for one point symmetry at one size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Orbits {
    size: usize,
    /// Owner cell index per cell, indexed `y * size + x`.
    owner: Vec<usize>,
    /// Cell indices ordered by owner, then index.
    order: Vec<usize>,
}

/// Largest exact rotational sub-fold of a `points`-fold symmetry.
const fn exact_fold(points: u8) -> u8 {
    if points % 4 == 0 {
        4
    } else if points % 2 == 0 {
        2
    } else {
        1
    }
}

/// Whether doubled center offsets `(u, v)` fall in the sector of an
/// `exact`-fold rotation.
const fn in_sector(u: i64, v: i64, exact: u8) -> bool {
    match exact {
        4 => (u > 0 && v >= 0) || (u == 0 && v == 0),
        2 => v > 0 || (v == 0 && u >= 0),
        _ => true,
    }
}

/// Exact quarter or half turns until `(u, v)` lands in the sector.
fn into_sector(mut u: i64, mut v: i64, exact: u8) -> (i64, i64) {
    for _ in 0..4 {
        if in_sector(u, v, exact) {
            break;
        }
        (u, v) = if exact == 2 { (-u, -v) } else { (-v, u) };
    }
    (u, v)
}

impl Orbits {
    /// Builds the owner table of a `points`-fold rotation.
    pub(crate) fn new(points: u8, size: usize, region: &CanonicalRegion) -> Self {
        let exact = exact_fold(points);
        #[allow(clippy::cast_possible_wrap)]
        let last = size.saturating_sub(1) as i64;
        // Offsets from the center, doubled to stay on integers
        #[allow(clippy::cast_possible_wrap)]
        let doubled = |x: usize, y: usize| (2 * x as i64 - last, 2 * y as i64 - last);
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let undoubled = |u: i64, v: i64| (((u + last) / 2) as usize, ((v + last) / 2) as usize);

        let mut owner = vec![0; size * size];
        for y in 0..size {
            for x in 0..size {
                let index = y * size + x;
                let (u, v) = doubled(x, y);
                if !in_sector(u, v, exact) {
                    continue;
                }
                owner[index] = if region.contains(x, y) {
                    index
                } else {
                    pull(u, v, points, exact, size, region).map_or(index, |(sx, sy)| sy * size + sx)
                };
            }
        }

        for y in 0..size {
            for x in 0..size {
                let (u, v) = doubled(x, y);
                if in_sector(u, v, exact) {
                    continue;
                }
                let (su, sv) = into_sector(u, v, exact);
                let (sx, sy) = undoubled(su, sv);
                owner[y * size + x] = owner[sy * size + sx];
            }
        }

        let mut order: Vec<usize> = (0..size * size).collect();
        order.sort_unstable_by_key(|&index| (owner[index], index));

        Self { size, owner, order }
    }

    /// Owner of `(x, y)`.
    pub(crate) fn owner(&self, x: usize, y: usize) -> (usize, usize) {
        let owner = self.owner[y * self.size + x];
        (owner % self.size, owner / self.size)
    }

    /// Every cell of the orbit containing `(x, y)`, itself included, in
    /// row-major order.
    pub(crate) fn members(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let owner = self.owner[y * self.size + x];
        let start = self.order.partition_point(|&index| self.owner[index] < owner);
        let end = self.order.partition_point(|&index| self.owner[index] <= owner);
        self.order[start..end]
            .iter()
            .map(move |&index| (index % self.size, index / self.size))
    }
}

/// Wedge cell nearest to the back-rotation of sector offset `(u, v)`.
fn pull(
    u: i64,
    v: i64,
    points: u8,
    exact: u8,
    size: usize,
    region: &CanonicalRegion,
) -> Option<(usize, usize)> {
    let step = TAU / f64::from(points);
    let turns = points / exact;
    #[allow(clippy::cast_precision_loss)]
    let (dx, dy) = (u as f64 / 2.0, v as f64 / 2.0);
    #[allow(clippy::cast_precision_loss)]
    let center = (size as f64 - 1.0) / 2.0;

    let angle = dy.atan2(dx).rem_euclid(TAU);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let turn = ((angle / step).floor() as u8).min(turns - 1);
    let (sin, cos) = (-f64::from(turn) * step).sin_cos();
    let px = center + dx * cos - dy * sin;
    let py = center + dx * sin + dy * cos;

    #[allow(clippy::cast_precision_loss)]
    let limit = (size - 1) as f64;
    let mut best: Option<((usize, usize), f64)> = None;
    for oy in -1_i32..=1 {
        for ox in -1_i32..=1 {
            let cx = px.round() + f64::from(ox);
            let cy = py.round() + f64::from(oy);
            if !(0.0..=limit).contains(&cx) || !(0.0..=limit).contains(&cy) {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let cell = (cx as usize, cy as usize);
            if !region.contains(cell.0, cell.1) {
                continue;
            }
            let distance = (cx - px).powi(2) + (cy - py).powi(2);
            match best {
                Some((_, nearest)) if nearest <= distance => {}
                _ => best = Some((cell, distance)),
            }
        }
    }
    best.map(|(cell, _)| cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::Symmetry;

    fn orbits(points: u8, size: usize) -> Orbits {
        Orbits::new(points, size, &CanonicalRegion::new(Symmetry::Point(points), size))
    }

    #[test]
    fn test_sector_turns_are_exact() {
        assert_eq!(into_sector(-3, -5, 2), (3, 5));
        assert_eq!(into_sector(-3, 5, 4), (5, 3));
        assert_eq!(into_sector(0, 0, 4), (0, 0));
        assert_eq!(into_sector(-7, 1, 1), (-7, 1));
    }

    #[test]
    fn test_canonical_cells_own_themselves() {
        let region = CanonicalRegion::new(Symmetry::Point(6), 21);
        let orbits = Orbits::new(6, 21, &region);
        for (x, y) in region.cells() {
            assert_eq!(orbits.owner(x, y), (x, y));
        }
    }

    #[test]
    fn test_antipode_shares_orbit() {
        for points in [6, 8, 10, 12] {
            let orbits = orbits(points, 24);
            for y in 0..24 {
                for x in 0..24 {
                    assert_eq!(orbits.owner(x, y), orbits.owner(23 - x, 23 - y), "point{points}");
                }
            }
        }
    }

    #[test]
    fn test_members_partition_the_grid() {
        let orbits = orbits(5, 17);
        let mut seen = vec![false; 17 * 17];
        for y in 0..17 {
            for x in 0..17 {
                if orbits.owner(x, y) != (x, y) {
                    continue;
                }
                for (mx, my) in orbits.members(x, y) {
                    assert!(!seen[my * 17 + mx]);
                    seen[my * 17 + mx] = true;
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }
}
