//! # Symmetry Resolver
//!
//! Maps a symmetry class and a grid size to:
//!
//! 1. **Canonical bounds** - the minimal cell subset every other cell derives from
//! 2. **Counterparts** - the symmetric images of an arbitrary coordinate
//! 3. **Orientations** - how a heading rotates when an oriented object is replicated
//!
//! ## Axis Naming
//!
//! Grids are indexed `(x, y)` with `x` the column. The mirror classes are named
//! after the coordinate they flip:
//!
//! ```text
//!   MirrorX   (x, y) -> (N-1-x, y)          reflection across the vertical center line
//!   MirrorZ   (x, y) -> (x, N-1-y)          reflection across the horizontal center line
//!   MirrorXZ  (x, y) -> (y, x)              reflection across the main diagonal
//!   MirrorZX  (x, y) -> (N-1-y, N-1-x)      reflection across the anti diagonal
//! ```
//!
//! All functions here are pure; they never touch grid buffers.

mod orbit;
mod region;
mod transform;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};
use crate::math::Vector2;

use orbit::Orbits;
pub use region::CanonicalRegion;
pub use transform::Transform;

/// Largest supported rotational fold.
pub const MAX_POINT_COUNT: u8 = 16;

/// One supported symmetry group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Symmetry {
    /// No symmetry; every cell is canonical.
    #[default]
    None,
    /// k-fold rotation around the grid center (k in 2..=16).
    Point(u8),
    /// Reflection across the vertical center line.
    MirrorX,
    /// Reflection across the horizontal center line.
    MirrorZ,
    /// Reflection across the main diagonal.
    MirrorXZ,
    /// Reflection across the anti diagonal.
    MirrorZX,
    /// Both center-line reflections (four-fold).
    Quad,
    /// Both diagonal reflections (four-fold).
    DiagonalQuad,
}

impl Symmetry {
    /// Builds a validated k-fold point symmetry.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::UnsupportedPointCount`] unless `points` is in `2..=16`.
    pub fn point(points: u8) -> GridResult<Self> {
        let symmetry = Self::Point(points);
        symmetry.validate()?;
        Ok(symmetry)
    }

    /// Number of symmetric images of a generic cell (including itself).
    #[must_use]
    pub const fn point_count(self) -> u8 {
        match self {
            Self::None => 1,
            Self::Point(k) => k,
            Self::MirrorX | Self::MirrorZ | Self::MirrorXZ | Self::MirrorZX => 2,
            Self::Quad | Self::DiagonalQuad => 4,
        }
    }

    /// Returns true for the rotational classes.
    #[must_use]
    pub const fn is_point(self) -> bool {
        matches!(self, Self::Point(_))
    }

    /// Checks the fold count of a point symmetry.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::UnsupportedPointCount`] for folds outside `2..=16`.
    pub fn validate(self) -> GridResult<()> {
        match self {
            Self::Point(k) if !(2..=MAX_POINT_COUNT).contains(&k) => {
                Err(GridError::UnsupportedPointCount(k))
            }
            _ => Ok(()),
        }
    }

    /// Transforms generating this group (identity excluded).
    #[must_use]
    pub fn transforms(self) -> Vec<Transform> {
        match self {
            Self::None => Vec::new(),
            Self::Point(k) if (2..=MAX_POINT_COUNT).contains(&k) => {
                (1..k).map(|step| Transform::Rotate { step, of: k }).collect()
            }
            Self::Point(_) => Vec::new(),
            Self::MirrorX => vec![Transform::MirrorX],
            Self::MirrorZ => vec![Transform::MirrorZ],
            Self::MirrorXZ => vec![Transform::MirrorXZ],
            Self::MirrorZX => vec![Transform::MirrorZX],
            Self::Quad => vec![Transform::MirrorX, Transform::MirrorZ, Transform::ANTIPODE],
            Self::DiagonalQuad => vec![
                Transform::MirrorXZ,
                Transform::MirrorZX,
                Transform::ANTIPODE,
            ],
        }
    }
}

impl fmt::Display for Symmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Point(k) => write!(f, "point{k}"),
            Self::MirrorX => f.write_str("x"),
            Self::MirrorZ => f.write_str("z"),
            Self::MirrorXZ => f.write_str("xz"),
            Self::MirrorZX => f.write_str("zx"),
            Self::Quad => f.write_str("quad"),
            Self::DiagonalQuad => f.write_str("diagonal_quad"),
        }
    }
}

impl FromStr for Symmetry {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "none" => Ok(Self::None),
            "x" => Ok(Self::MirrorX),
            "z" => Ok(Self::MirrorZ),
            "xz" => Ok(Self::MirrorXZ),
            "zx" => Ok(Self::MirrorZX),
            "quad" => Ok(Self::Quad),
            "diagonal_quad" | "diag" => Ok(Self::DiagonalQuad),
            other => {
                let points = other
                    .strip_prefix("point")
                    .and_then(|n| n.parse::<u8>().ok())
                    .ok_or_else(|| GridError::parameter("symmetry", format!("unknown symmetry `{s}`")))?;
                Self::point(points)
            }
        }
    }
}

impl TryFrom<String> for Symmetry {
    type Error = GridError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Symmetry> for String {
    fn from(value: Symmetry) -> Self {
        value.to_string()
    }
}

/// Selects which of the three symmetry classes an operation uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymmetryType {
    /// Symmetry of the terrain itself.
    #[default]
    Terrain,
    /// Symmetry between teams.
    Team,
    /// Symmetry between individual spawns.
    Spawn,
}

#[derive(Deserialize)]
struct RawSymmetrySettings {
    terrain: Symmetry,
    team: Option<Symmetry>,
    spawn: Option<Symmetry>,
}

/// The three symmetry classes a grid carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSymmetrySettings")]
pub struct SymmetrySettings {
    terrain: Symmetry,
    team: Symmetry,
    spawn: Symmetry,
}

impl SymmetrySettings {
    /// Creates validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidSymmetry`] when a point-symmetric team or
    /// spawn class does not evenly divide the terrain class, and
    /// [`GridError::UnsupportedPointCount`] for unsupported folds.
    pub fn new(terrain: Symmetry, team: Symmetry, spawn: Symmetry) -> GridResult<Self> {
        terrain.validate()?;
        team.validate()?;
        spawn.validate()?;

        let terrain_points = terrain.point_count();
        for (role, symmetry) in [("team", team), ("spawn", spawn)] {
            if symmetry.is_point() && terrain_points % symmetry.point_count() != 0 {
                return Err(GridError::InvalidSymmetry {
                    role,
                    symmetry,
                    points: symmetry.point_count(),
                    terrain,
                    terrain_points,
                });
            }
        }

        Ok(Self {
            terrain,
            team,
            spawn,
        })
    }

    /// Same symmetry for all three classes.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::UnsupportedPointCount`] for unsupported folds.
    pub fn uniform(symmetry: Symmetry) -> GridResult<Self> {
        Self::new(symmetry, symmetry, symmetry)
    }

    /// Returns the symmetry selected by `symmetry_type`.
    #[inline]
    #[must_use]
    pub const fn symmetry(&self, symmetry_type: SymmetryType) -> Symmetry {
        match symmetry_type {
            SymmetryType::Terrain => self.terrain,
            SymmetryType::Team => self.team,
            SymmetryType::Spawn => self.spawn,
        }
    }

    /// Terrain symmetry.
    #[must_use]
    pub const fn terrain(&self) -> Symmetry {
        self.terrain
    }

    /// Team symmetry.
    #[must_use]
    pub const fn team(&self) -> Symmetry {
        self.team
    }

    /// Spawn symmetry.
    #[must_use]
    pub const fn spawn(&self) -> Symmetry {
        self.spawn
    }
}

impl TryFrom<RawSymmetrySettings> for SymmetrySettings {
    type Error = GridError;

    fn try_from(raw: RawSymmetrySettings) -> Result<Self, Self::Error> {
        Self::new(
            raw.terrain,
            raw.team.unwrap_or(raw.terrain),
            raw.spawn.unwrap_or(raw.terrain),
        )
    }
}

/// Resolves canonical bounds and counterparts for one symmetry at one size.
///
/// Building a resolver precomputes the canonical region, so hold on to it when
/// iterating a grid.
#[derive(Clone, Debug)]
pub struct SymmetryResolver {
    symmetry: Symmetry,
    size: usize,
    region: CanonicalRegion,
    transforms: Vec<Transform>,
    /// Present for the point symmetries whose rotations leave the lattice.
    orbits: Option<Orbits>,
}

impl SymmetryResolver {
    /// Creates a resolver for `symmetry` on an `size` x `size` grid.
    #[must_use]
    pub fn new(symmetry: Symmetry, size: usize) -> Self {
        let region = CanonicalRegion::new(symmetry, size);
        let orbits = match symmetry {
            Symmetry::Point(k) if k != 4 && (3..=MAX_POINT_COUNT).contains(&k) => {
                Some(Orbits::new(k, size, &region))
            }
            _ => None,
        };
        Self {
            symmetry,
            size,
            region,
            transforms: symmetry.transforms(),
            orbits,
        }
    }

    /// The resolved symmetry.
    #[must_use]
    pub const fn symmetry(&self) -> Symmetry {
        self.symmetry
    }

    /// Grid size this resolver was built for.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Canonical iteration bounds.
    #[must_use]
    pub const fn region(&self) -> &CanonicalRegion {
        &self.region
    }

    /// Symmetric counterparts of `(x, y)`.
    ///
    /// The cell itself is never included, images falling outside the grid are
    /// dropped and duplicates (cells on an axis) are removed. For rotations
    /// off the lattice these are the other cells of the orbit, in row-major
    /// order; exact quarter turns and the antipode are always among them.
    #[must_use]
    pub fn counterparts(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        if let Some(orbits) = &self.orbits {
            return orbits.members(x, y).filter(|&cell| cell != (x, y)).collect();
        }
        let mut points = Vec::with_capacity(self.transforms.len());
        for transform in &self.transforms {
            if let Some(point) = transform.apply_cell(x, y, self.size) {
                if point != (x, y) && !points.contains(&point) {
                    points.push(point);
                }
            }
        }
        points
    }

    /// Canonical cell whose value `(x, y)` must carry.
    ///
    /// Canonical cells are their own source. Returns `None` for a cell that
    /// heads its own orbit without being canonical (grid corners under a
    /// rotation off the lattice); its counterparts then pull from it.
    #[must_use]
    pub fn source(&self, x: usize, y: usize) -> Option<(usize, usize)> {
        if self.region.contains(x, y) {
            return Some((x, y));
        }
        if let Some(orbits) = &self.orbits {
            let owner = orbits.owner(x, y);
            return (owner != (x, y)).then_some(owner);
        }
        self.transforms
            .iter()
            .filter_map(|t| t.apply_cell(x, y, self.size))
            .find(|&(sx, sy)| self.region.contains(sx, sy))
    }

    /// Orientation of each replicated copy, in transform order.
    #[must_use]
    pub fn orientations(&self, angle: f32) -> Vec<f32> {
        self.transforms.iter().map(|t| t.orient(angle)).collect()
    }

    /// Replicates a continuous position and heading through every transform.
    ///
    /// Positions live in `[0, size]` (a cell `i` spans `[i, i + 1)`), so
    /// reflections use `size` as the span rather than `size - 1`.
    #[must_use]
    pub fn replicate_point(&self, position: Vector2, angle: f32) -> Vec<(Vector2, f32)> {
        #[allow(clippy::cast_precision_loss)]
        let span = self.size as f32;
        self.transforms
            .iter()
            .map(|t| (t.apply(position, span), t.orient(angle)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_counts() {
        assert_eq!(Symmetry::None.point_count(), 1);
        assert_eq!(Symmetry::Point(6).point_count(), 6);
        assert_eq!(Symmetry::MirrorZX.point_count(), 2);
        assert_eq!(Symmetry::DiagonalQuad.point_count(), 4);
    }

    #[test]
    fn test_point_validation() {
        assert!(Symmetry::point(2).is_ok());
        assert!(Symmetry::point(16).is_ok());
        assert_eq!(Symmetry::point(1), Err(GridError::UnsupportedPointCount(1)));
        assert_eq!(Symmetry::point(17), Err(GridError::UnsupportedPointCount(17)));
    }

    #[test]
    fn test_team_must_divide_terrain() {
        assert!(SymmetrySettings::new(Symmetry::Point(4), Symmetry::Point(2), Symmetry::Point(4)).is_ok());
        assert!(SymmetrySettings::new(Symmetry::Quad, Symmetry::MirrorX, Symmetry::Point(4)).is_ok());

        let err = SymmetrySettings::new(Symmetry::Point(6), Symmetry::Point(4), Symmetry::Point(6))
            .unwrap_err();
        assert!(matches!(err, GridError::InvalidSymmetry { role: "team", .. }));

        let err = SymmetrySettings::new(Symmetry::MirrorX, Symmetry::MirrorX, Symmetry::Point(3))
            .unwrap_err();
        assert!(matches!(err, GridError::InvalidSymmetry { role: "spawn", .. }));
    }

    #[test]
    fn test_parse_and_display() {
        for symmetry in [
            Symmetry::None,
            Symmetry::Point(2),
            Symmetry::Point(11),
            Symmetry::MirrorX,
            Symmetry::MirrorZ,
            Symmetry::MirrorXZ,
            Symmetry::MirrorZX,
            Symmetry::Quad,
            Symmetry::DiagonalQuad,
        ] {
            assert_eq!(symmetry.to_string().parse::<Symmetry>(), Ok(symmetry));
        }
        assert!("point0".parse::<Symmetry>().is_err());
        assert!("spiral".parse::<Symmetry>().is_err());
    }

    #[test]
    fn test_counterparts_point2() {
        let resolver = SymmetryResolver::new(Symmetry::Point(2), 8);
        assert_eq!(resolver.counterparts(1, 2), vec![(6, 5)]);
    }

    #[test]
    fn test_axis_cells_not_replicated_onto_themselves() {
        let resolver = SymmetryResolver::new(Symmetry::MirrorX, 5);
        assert!(resolver.counterparts(2, 3).is_empty());

        let resolver = SymmetryResolver::new(Symmetry::Quad, 5);
        assert_eq!(resolver.counterparts(2, 0), vec![(2, 4)]);
        assert!(resolver.counterparts(2, 2).is_empty());
    }

    #[test]
    fn test_quad_counterparts() {
        let resolver = SymmetryResolver::new(Symmetry::Quad, 10);
        assert_eq!(resolver.counterparts(1, 2), vec![(8, 2), (1, 7), (8, 7)]);
    }

    #[test]
    fn test_point4_counterparts_are_exact() {
        let resolver = SymmetryResolver::new(Symmetry::Point(4), 10);
        assert_eq!(resolver.counterparts(1, 2), vec![(7, 1), (8, 7), (2, 8)]);
    }

    #[test]
    fn test_orientations_follow_transforms() {
        use std::f32::consts::{FRAC_PI_2, PI};

        let resolver = SymmetryResolver::new(Symmetry::MirrorX, 16);
        let rotated = resolver.orientations(0.0);
        assert!((rotated[0] - PI).abs() < 1e-5);

        let resolver = SymmetryResolver::new(Symmetry::Point(4), 16);
        let rotated = resolver.orientations(0.0);
        assert!((rotated[0] - FRAC_PI_2).abs() < 1e-5);
        assert!((rotated[1] - PI).abs() < 1e-5);
    }

    #[test]
    fn test_replicate_point_uses_continuous_span() {
        let resolver = SymmetryResolver::new(Symmetry::Point(2), 100);
        let copies = resolver.replicate_point(Vector2::new(10.0, 20.0), 0.0);
        assert_eq!(copies.len(), 1);
        assert!((copies[0].0.x - 90.0).abs() < 1e-4);
        assert!((copies[0].0.y - 80.0).abs() < 1e-4);
    }

    #[test]
    fn test_settings_from_toml() {
        let settings: SymmetrySettings =
            toml::from_str("terrain = \"point4\"\nteam = \"point2\"").unwrap();
        assert_eq!(settings.terrain(), Symmetry::Point(4));
        assert_eq!(settings.team(), Symmetry::Point(2));
        assert_eq!(settings.spawn(), Symmetry::Point(4));

        let invalid: Result<SymmetrySettings, _> =
            toml::from_str("terrain = \"point6\"\nteam = \"point4\"");
        assert!(invalid.is_err());
    }
}
