//! # TESSERA Core
//!
//! Symmetry-aware grid algorithms for procedural map generation.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same grid
//! 2. **Symmetric**: Every symmetry-aware operation leaves the grid closed
//!    under its active symmetry class
//! 3. **Parallel inside**: Heavy kernels split the grid into row bands
//!
//! ## Core Components
//!
//! - `SymmetryResolver`: canonical bounds and counterparts per symmetry class
//! - `Grid<T>`: the mask family (`BooleanGrid`, `FloatGrid`, `VectorGrid`)
//! - `GridSeed`: master seed with per-grid derivation
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{BooleanGrid, GridSeed, Symmetry, SymmetrySettings, SymmetryType};
//!
//! let settings = SymmetrySettings::uniform(Symmetry::Point(2)).unwrap();
//! let mut land = BooleanGrid::new(64, GridSeed::new(7), settings, "land").unwrap();
//! land.randomize(0.3, SymmetryType::Terrain).unwrap();
//! land.erode(0.5, SymmetryType::Terrain, 2).unwrap();
//!
//! assert_eq!(land.get(3, 10), land.get(60, 53));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod grid;
pub mod math;
pub mod seed;
pub mod symmetry;

pub use error::{GridError, GridResult};
pub use grid::{BooleanGrid, Cell, FloatGrid, Grid, VectorGrid};
pub use math::Vector2;
pub use seed::GridSeed;
pub use symmetry::{
    CanonicalRegion, Symmetry, SymmetryResolver, SymmetrySettings, SymmetryType, Transform,
    MAX_POINT_COUNT,
};
