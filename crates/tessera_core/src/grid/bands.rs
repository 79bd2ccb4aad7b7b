//! Row-band kernels.
//!
//! A kernel splits the output buffer into [`BAND_COUNT`] contiguous row bands
//! and computes them in parallel. Bands only ever write their own rows, and
//! read from an immutable input, so the result is independent of scheduling.

use rayon::prelude::*;

/// Number of row bands per kernel invocation.
pub(crate) const BAND_COUNT: usize = 4;

/// Runs `kernel(band, first_row, rows)` over each band of `out`.
///
/// `rows` holds whole rows of a `size`-wide grid; the last band may be
/// shorter. Returns once every band is done.
pub(crate) fn for_each_band<T, F>(out: &mut [T], size: usize, kernel: F)
where
    T: Send,
    F: Fn(usize, usize, &mut [T]) + Sync,
{
    let rows_per_band = size.div_ceil(BAND_COUNT).max(1);
    out.par_chunks_mut(rows_per_band * size)
        .enumerate()
        .for_each(|(band, rows)| kernel(band, band * rows_per_band, rows));
}

/// Offsets `(dx, dy)` with `dx² + dy² <= radius²`.
pub(crate) fn disc_offsets(radius: f32) -> Vec<(isize, isize)> {
    #[allow(clippy::cast_possible_truncation)]
    let reach = radius.max(0.0).floor() as isize;
    let radius_sq = radius * radius;
    let mut offsets = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            #[allow(clippy::cast_precision_loss)]
            let distance_sq = (dx * dx + dy * dy) as f32;
            if distance_sq <= radius_sq {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

/// Neighbour of `(x, y)` at `offset`, if it lies inside a `size` grid.
#[inline]
pub(crate) fn offset_cell(
    x: usize,
    y: usize,
    (dx, dy): (isize, isize),
    size: usize,
) -> Option<(usize, usize)> {
    let nx = x.checked_add_signed(dx)?;
    let ny = y.checked_add_signed(dy)?;
    (nx < size && ny < size).then_some((nx, ny))
}
