//! Single symmetry transforms on cells, continuous points and headings.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::math::Vector2;

/// One non-identity element of a symmetry group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transform {
    /// `x -> span - x`
    MirrorX,
    /// `y -> span - y`
    MirrorZ,
    /// `(x, y) -> (y, x)`
    MirrorXZ,
    /// `(x, y) -> (span - y, span - x)`
    MirrorZX,
    /// Rotation by `2π * step / of` around the center.
    Rotate {
        /// Rotation index.
        step: u8,
        /// Fold of the owning point symmetry.
        of: u8,
    },
}

impl Transform {
    /// Half turn around the center.
    pub const ANTIPODE: Self = Self::Rotate { step: 1, of: 2 };

    /// Number of exact quarter turns, if this rotation lands on the lattice.
    #[inline]
    fn quarter_turns(step: u8, of: u8) -> Option<u8> {
        let scaled = u16::from(step) * 4;
        if of != 0 && scaled % u16::from(of) == 0 {
            // of <= 16 so the quotient fits comfortably in a u8
            Some(((scaled / u16::from(of)) % 4) as u8)
        } else {
            None
        }
    }

    #[inline]
    fn angle(step: u8, of: u8) -> f64 {
        std::f64::consts::TAU * f64::from(step) / f64::from(of)
    }

    /// Applies the transform to a cell of an `size` x `size` grid.
    ///
    /// Mirrors and quarter turns are exact integer maps. Other rotations are
    /// rounded to the nearest cell and return `None` when the image leaves
    /// the grid.
    #[must_use]
    pub fn apply_cell(self, x: usize, y: usize, size: usize) -> Option<(usize, usize)> {
        debug_assert!(x < size && y < size);
        let last = size - 1;
        match self {
            Self::MirrorX => Some((last - x, y)),
            Self::MirrorZ => Some((x, last - y)),
            Self::MirrorXZ => Some((y, x)),
            Self::MirrorZX => Some((last - y, last - x)),
            Self::Rotate { step, of } => match Self::quarter_turns(step, of) {
                Some(0) => Some((x, y)),
                Some(1) => Some((last - y, x)),
                Some(2) => Some((last - x, last - y)),
                Some(_) => Some((y, last - x)),
                None => {
                    #[allow(clippy::cast_precision_loss)]
                    let center = last as f64 / 2.0;
                    #[allow(clippy::cast_precision_loss)]
                    let (dx, dy) = (x as f64 - center, y as f64 - center);
                    let (sin, cos) = Self::angle(step, of).sin_cos();
                    let rx = (center + dx * cos - dy * sin).round();
                    let ry = (center + dx * sin + dy * cos).round();
                    #[allow(clippy::cast_precision_loss)]
                    let limit = last as f64;
                    if (0.0..=limit).contains(&rx) && (0.0..=limit).contains(&ry) {
                        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                        let cell = (rx as usize, ry as usize);
                        Some(cell)
                    } else {
                        None
                    }
                }
            },
        }
    }

    /// Applies the transform to a continuous point on `[0, span]²`.
    #[must_use]
    pub fn apply(self, point: Vector2, span: f32) -> Vector2 {
        match self {
            Self::MirrorX => Vector2::new(span - point.x, point.y),
            Self::MirrorZ => Vector2::new(point.x, span - point.y),
            Self::MirrorXZ => Vector2::new(point.y, point.x),
            Self::MirrorZX => Vector2::new(span - point.y, span - point.x),
            Self::Rotate { step, of } => match Self::quarter_turns(step, of) {
                Some(0) => point,
                Some(1) => Vector2::new(span - point.y, point.x),
                Some(2) => Vector2::new(span - point.x, span - point.y),
                Some(_) => Vector2::new(point.y, span - point.x),
                None => {
                    let center = span / 2.0;
                    let offset = Vector2::new(point.x - center, point.y - center);
                    #[allow(clippy::cast_possible_truncation)]
                    let (sin, cos) = (Self::angle(step, of) as f32).sin_cos();
                    Vector2::new(
                        center + offset.x * cos - offset.y * sin,
                        center + offset.x * sin + offset.y * cos,
                    )
                }
            },
        }
    }

    /// Heading of a replicated object, normalized to `[0, 2π)`.
    ///
    /// Angles are measured from +x towards +y.
    #[must_use]
    pub fn orient(self, angle: f32) -> f32 {
        let rotated = match self {
            Self::MirrorX => PI - angle,
            Self::MirrorZ => -angle,
            Self::MirrorXZ => FRAC_PI_2 - angle,
            Self::MirrorZX => -FRAC_PI_2 - angle,
            Self::Rotate { step, of } => {
                #[allow(clippy::cast_possible_truncation)]
                let turn = Self::angle(step, of) as f32;
                angle + turn
            }
        };
        rotated.rem_euclid(TAU)
    }
}
