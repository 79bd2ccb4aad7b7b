//! # TESSERA Pipeline
//!
//! Records grid-producing calls as a dependency graph and runs the graph on a
//! worker pool.
//!
//! ## Design Principles
//!
//! 1. **Non-blocking construction** - `add` and every `Tracked` method return immediately
//! 2. **Implicit edges** - each input depends on the latest entry that produced it
//! 3. **Immutable snapshots** - completed grids are shared `Arc`s; writers clone
//! 4. **Fail fast** - a failing node aborts the run with full context, no retries
//!
//! ## Thread Safety
//!
//! A `Pipeline` is a context object, not global state. Several pipelines may
//! run at once; a grid belongs to the pipeline that tracks it.
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{BooleanGrid, GridSeed, Symmetry, SymmetrySettings, SymmetryType};
//! use tessera_pipeline::{Pipeline, PipelineConfig};
//!
//! let settings = SymmetrySettings::uniform(Symmetry::Point(2)).unwrap();
//! let seed = GridSeed::new(7);
//! let pipeline = Pipeline::new(PipelineConfig::default().with_workers(2));
//!
//! let land = pipeline
//!     .track(BooleanGrid::new(64, seed.derive_named("land"), settings, "land").unwrap())
//!     .unwrap();
//! land.randomize(0.4, SymmetryType::Terrain).unwrap();
//! land.erode(0.5, SymmetryType::Terrain, 1).unwrap();
//! let height = land.to_float("height", 0.0, 1.0).unwrap();
//! height.smooth(3.0, Some(&land)).unwrap();
//!
//! pipeline.start().unwrap();
//! let height = height.wait().unwrap();
//! pipeline.join().unwrap();
//!
//! assert_eq!(height.get(3, 10), height.get(60, 53));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod description;
pub mod determinism;
mod entry;
pub mod error;
pub mod pipeline;
mod pool;
pub mod registry;
pub mod snapshot;
pub mod tracked;

pub use config::PipelineConfig;
pub use description::{GraphDescription, GridDescription, StepDescription};
pub use determinism::{DeterminismLog, HashRecord};
pub use entry::{EntryStatus, NodeTask};
pub use error::{NodeError, NodeFailure, PipelineError, PipelineResult};
pub use pipeline::{GridInfo, Pipeline};
pub use registry::{Conversion, Operation, OperationArgs, OperationRegistry, RegistryCell};
pub use snapshot::{
    clone_grid, downcast_arc, downcast_ref, GridId, GridKind, GridSnapshot, KindedCell,
    SharedSnapshot,
};
pub use tracked::Tracked;
