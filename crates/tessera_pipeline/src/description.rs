//! # Graph Descriptions
//!
//! Declares grids and registry operations as TOML, so a generation graph can
//! be stored, diffed and replayed without recompiling.
//!
//! ```toml
//! seed = 1234
//!
//! [[grids]]
//! name = "land"
//! kind = "boolean"
//! size = 256
//! symmetry = { terrain = "point2" }
//!
//! [[steps]]
//! grid = "land"
//! operation = "randomize"
//! params = [0.4]
//!
//! [[steps]]
//! grid = "land"
//! operation = "to_float"
//! params = [0.0, 1.0]
//! output = "height"
//! ```
//!
//! A step with `output` is a kind-changing conversion; the output grid is
//! declared on first use. Grid seeds derive from the master seed and the grid
//! name unless a grid sets its own.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use tessera_core::{
    BooleanGrid, FloatGrid, GridSeed, SymmetrySettings, SymmetryType, Vector2, VectorGrid,
};

use crate::entry::NodeTask;
use crate::error::{NodeError, PipelineError, PipelineResult};
use crate::pipeline::{GridInfo, Pipeline};
use crate::registry::OperationRegistry;
use crate::snapshot::{GridId, GridKind, SharedSnapshot};

/// One declared grid.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridDescription {
    /// Unique name; also the grid's debug name.
    pub name: String,
    /// Element type.
    pub kind: GridKind,
    /// Side length.
    pub size: usize,
    /// Explicit seed; derived from the master seed when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Symmetry settings; no symmetry when absent.
    #[serde(default)]
    pub symmetry: SymmetrySettings,
}

/// One recorded operation.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDescription {
    /// Grid the operation runs on.
    pub grid: String,
    /// Registry id.
    pub operation: String,
    /// Numeric parameters.
    #[serde(default)]
    pub params: Vec<f32>,
    /// Source grid names.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Symmetry class for propagating operations.
    #[serde(default)]
    pub symmetry_type: SymmetryType,
    /// Output grid for conversions.
    #[serde(default)]
    pub output: Option<String>,
}

/// A whole generation graph.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphDescription {
    /// Master seed.
    #[serde(default)]
    pub seed: u64,
    /// Grids, in declaration order.
    #[serde(default)]
    pub grids: Vec<GridDescription>,
    /// Steps, in recording order.
    #[serde(default)]
    pub steps: Vec<StepDescription>,
}

impl GraphDescription {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Toml`] for malformed input, including invalid
    /// symmetry settings.
    pub fn from_toml_str(source: &str) -> PipelineResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Loads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] or [`PipelineError::Toml`].
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Tracks every grid and records every step on `pipeline`.
    ///
    /// Returns the id of each grid by name. Steps are validated as they are
    /// recorded; on error the pipeline keeps the steps recorded so far. Every
    /// step is recorded at the caller's location under the method
    /// `<operation>#<step index>`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Description`] for duplicate or unknown names
    /// and the registry and protocol errors of each step.
    #[track_caller]
    pub fn instantiate(&self, pipeline: &Pipeline) -> PipelineResult<BTreeMap<String, GridId>> {
        let master = GridSeed::new(self.seed);
        let mut ids = BTreeMap::new();

        for grid in &self.grids {
            if ids.contains_key(&grid.name) {
                return Err(PipelineError::Description(format!(
                    "grid `{}` declared twice",
                    grid.name
                )));
            }
            let seed = grid
                .seed
                .map_or_else(|| master.derive_named(&grid.name), GridSeed::new);
            let snapshot: SharedSnapshot = match grid.kind {
                GridKind::Boolean => {
                    Arc::new(BooleanGrid::new(grid.size, seed, grid.symmetry, grid.name.as_str())?)
                }
                GridKind::Float => {
                    Arc::new(FloatGrid::new(grid.size, seed, grid.symmetry, grid.name.as_str())?)
                }
                GridKind::Vector => {
                    Arc::new(VectorGrid::new(grid.size, seed, grid.symmetry, grid.name.as_str())?)
                }
            };
            ids.insert(grid.name.clone(), pipeline.register(snapshot)?);
        }

        for (index, step) in self.steps.iter().enumerate() {
            let method = format!("{}#{index}", step.operation);
            match &step.output {
                Some(output) => Self::convert(pipeline, &mut ids, step, &method, output)?,
                None => Self::apply(pipeline, &ids, step, &method)?,
            }
        }

        tracing::debug!(
            "instantiated graph: {} grids, {} steps",
            ids.len(),
            self.steps.len()
        );
        Ok(ids)
    }

    #[track_caller]
    fn apply(
        pipeline: &Pipeline,
        ids: &BTreeMap<String, GridId>,
        step: &StepDescription,
        method: &str,
    ) -> PipelineResult<()> {
        let grid = lookup(ids, &step.grid)?;
        let sources = step
            .sources
            .iter()
            .map(|name| lookup(ids, name))
            .collect::<PipelineResult<Vec<_>>>()?;

        match pipeline.info(grid)?.kind {
            GridKind::Boolean => pipeline.tracked::<bool>(grid)?.apply_as(
                method,
                &step.operation,
                &step.params,
                &sources,
                step.symmetry_type,
            ),
            GridKind::Float => pipeline.tracked::<f32>(grid)?.apply_as(
                method,
                &step.operation,
                &step.params,
                &sources,
                step.symmetry_type,
            ),
            GridKind::Vector => pipeline.tracked::<Vector2>(grid)?.apply_as(
                method,
                &step.operation,
                &step.params,
                &sources,
                step.symmetry_type,
            ),
        }?;
        Ok(())
    }

    #[track_caller]
    fn convert(
        pipeline: &Pipeline,
        ids: &mut BTreeMap<String, GridId>,
        step: &StepDescription,
        method: &str,
        output: &str,
    ) -> PipelineResult<()> {
        let conversion = OperationRegistry::conversion(&step.operation)?;
        conversion.check_arity(step.params.len())?;
        if !step.sources.is_empty() {
            return Err(PipelineError::Arity {
                operation: step.operation.clone(),
                what: "sources",
                expected: 0,
                actual: step.sources.len(),
            });
        }

        let input = lookup(ids, &step.grid)?;
        let info = pipeline.info(input)?;
        if info.kind != conversion.from {
            return Err(PipelineError::TypeMismatch {
                grid: input,
                expected: conversion.from,
                actual: info.kind,
            });
        }

        let result = match ids.get(output) {
            Some(&existing) => {
                let actual = pipeline.info(existing)?.kind;
                if actual != conversion.to {
                    return Err(PipelineError::TypeMismatch {
                        grid: existing,
                        expected: conversion.to,
                        actual,
                    });
                }
                existing
            }
            None => {
                let id = pipeline.declare(GridInfo {
                    name: output.to_owned(),
                    kind: conversion.to,
                    ..info
                })?;
                ids.insert(output.to_owned(), id);
                id
            }
        };

        let params = step.params.clone();
        let name = output.to_owned();
        let task: NodeTask = Box::new(
            move |inputs: &[SharedSnapshot]| -> Result<SharedSnapshot, NodeError> {
                let input = inputs.first().ok_or(NodeError::InputCount {
                    expected: 1,
                    actual: 0,
                })?;
                conversion.invoke(input.as_ref(), &params, &name)
            },
        );
        pipeline.add(input, result, &[input], method, task)?;
        Ok(())
    }
}

fn lookup(ids: &BTreeMap<String, GridId>, name: &str) -> PipelineResult<GridId> {
    ids.get(name)
        .copied()
        .ok_or_else(|| PipelineError::Description(format!("unknown grid `{name}`")))
}
