//! # Typed Grid Handles
//!
//! [`Tracked`] wraps a [`GridId`] with its element type, so graph
//! construction reads like direct grid calls:
//!
//! ```text
//!   let land = pipeline.track(land)?;          // Tracked<bool>
//!   land.randomize(0.3, SymmetryType::Terrain)?;
//!   land.erode(0.5, SymmetryType::Terrain, 2)?;
//!   let height = land.to_float("height", 0.0, 1.0)?;
//!   height.smooth(4.0, Some(&land))?;
//!   pipeline.start()?;
//!   let height = height.wait()?;                // Arc<FloatGrid>
//! ```
//!
//! Every method records an entry and returns immediately. Each one captures
//! its caller's location for failure reports and the determinism log.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tessera_core::{FloatGrid, Grid, GridError, GridResult, SymmetryType, Vector2, VectorGrid};

use crate::entry::NodeTask;
use crate::error::{NodeError, PipelineError, PipelineResult};
use crate::pipeline::{GridInfo, Pipeline};
use crate::registry::{to_usize, OperationArgs, RegistryCell};
use crate::snapshot::{clone_grid, downcast_arc, downcast_ref, GridId, KindedCell, SharedSnapshot};

/// Typed handle of a grid tracked by a [`Pipeline`].
#[derive(Clone, Copy)]
pub struct Tracked<'p, T: KindedCell> {
    pipeline: &'p Pipeline,
    id: GridId,
    _cell: PhantomData<fn() -> T>,
}

impl<T: KindedCell> fmt::Debug for Tracked<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tracked<{}>({})", T::KIND, self.id)
    }
}

impl Pipeline {
    /// Starts tracking `grid`; its current content becomes the initial state.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AlreadyStarted`] after `start`.
    pub fn track<T: KindedCell>(&self, grid: Grid<T>) -> PipelineResult<Tracked<'_, T>> {
        let id = self.register(Arc::new(grid))?;
        Ok(Tracked::new(self, id))
    }

    /// Re-acquires a typed handle from an id.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownGrid`] or
    /// [`PipelineError::TypeMismatch`].
    pub fn tracked<T: KindedCell>(&self, id: GridId) -> PipelineResult<Tracked<'_, T>> {
        let actual = self.info(id)?.kind;
        if actual != T::KIND {
            return Err(PipelineError::TypeMismatch {
                grid: id,
                expected: T::KIND,
                actual,
            });
        }
        Ok(Tracked::new(self, id))
    }
}

fn first(inputs: &[SharedSnapshot]) -> Result<&SharedSnapshot, NodeError> {
    inputs.first().ok_or(NodeError::InputCount {
        expected: 1,
        actual: 0,
    })
}

impl<'p, T: KindedCell> Tracked<'p, T> {
    const fn new(pipeline: &'p Pipeline, id: GridId) -> Self {
        Self {
            pipeline,
            id,
            _cell: PhantomData,
        }
    }

    /// Pipeline-wide id.
    #[must_use]
    pub const fn id(&self) -> GridId {
        self.id
    }

    /// Owning pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &'p Pipeline {
        self.pipeline
    }

    /// Declaration-time metadata.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownGrid`] if the id belongs to another
    /// pipeline.
    pub fn info(&self) -> PipelineResult<GridInfo> {
        self.pipeline.info(self.id)
    }

    /// Records an in-place mutation of this grid.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn update<F>(&self, method: &str, f: F) -> PipelineResult<usize>
    where
        F: FnOnce(&mut Grid<T>) -> GridResult<()> + Send + 'static,
    {
        self.update_with(method, &[], move |grid, _| Ok(f(grid)?))
    }

    /// Records an in-place mutation that also reads `sources`.
    ///
    /// The closure receives a private copy of this grid plus one snapshot per
    /// source, in order.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn update_with<F>(&self, method: &str, sources: &[GridId], f: F) -> PipelineResult<usize>
    where
        F: FnOnce(&mut Grid<T>, &[SharedSnapshot]) -> Result<(), NodeError> + Send + 'static,
    {
        let mut dependencies = Vec::with_capacity(sources.len() + 1);
        dependencies.push(self.id);
        dependencies.extend_from_slice(sources);

        let task: NodeTask = Box::new(
            move |inputs: &[SharedSnapshot]| -> Result<SharedSnapshot, NodeError> {
                let mut grid = clone_grid::<T>(first(inputs)?.as_ref())?;
                f(&mut grid, &inputs[1..])?;
                Ok(Arc::new(grid))
            },
        );
        self.pipeline.add(self.id, self.id, &dependencies, method, task)
    }

    /// Records a computation that builds a new grid from this one.
    ///
    /// The new grid is declared with this grid's size and symmetry settings
    /// and named `name`.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn derive<U, F>(&self, name: impl Into<String>, method: &str, f: F) -> PipelineResult<Tracked<'p, U>>
    where
        U: KindedCell,
        F: FnOnce(&Grid<T>) -> Result<Grid<U>, NodeError> + Send + 'static,
    {
        let source = self.info()?;
        let name = name.into();
        let id = self.pipeline.declare(GridInfo {
            name: name.clone(),
            size: source.size,
            settings: source.settings,
            kind: U::KIND,
        })?;

        let task: NodeTask = Box::new(
            move |inputs: &[SharedSnapshot]| -> Result<SharedSnapshot, NodeError> {
                let mut output = f(downcast_ref::<T>(first(inputs)?.as_ref())?)?;
                output.set_name(name);
                Ok(Arc::new(output))
            },
        );
        self.pipeline.add(self.id, id, &[self.id], method, task)?;
        Ok(Tracked::new(self.pipeline, id))
    }

    /// Blocks until the latest producer of this grid completes.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Pipeline::await_grids`].
    pub fn wait(&self) -> PipelineResult<Arc<Grid<T>>> {
        let snapshot = self
            .pipeline
            .await_grids(&[self.id])?
            .pop()
            .ok_or(PipelineError::UnknownGrid(self.id))?;
        let actual = snapshot.kind();
        downcast_arc::<T>(snapshot).map_err(|_| PipelineError::TypeMismatch {
            grid: self.id,
            expected: T::KIND,
            actual,
        })
    }

    /// Records an operation that reads one other tracked grid. The symmetry
    /// settings are checked now, not when the node runs.
    #[track_caller]
    fn with_source<S, F>(&self, method: &str, source: &Tracked<'p, S>, f: F) -> PipelineResult<usize>
    where
        S: KindedCell,
        F: FnOnce(&mut Grid<T>, &Grid<S>) -> GridResult<()> + Send + 'static,
    {
        self.pipeline.check_compatible(self.id, source.id)?;
        self.update_with(method, &[source.id], move |grid, inputs| {
            Ok(f(grid, downcast_ref::<S>(first(inputs)?.as_ref())?)?)
        })
    }

    /// Copies values from the canonical region to every counterpart.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn apply_symmetry(&self, symmetry_type: SymmetryType) -> PipelineResult<usize> {
        self.update("apply_symmetry", move |grid| {
            grid.apply_symmetry(symmetry_type);
            Ok(())
        })
    }

    /// Fills a disc. Does not propagate.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn fill_circle(&self, center: Vector2, radius: f32, value: T) -> PipelineResult<usize> {
        self.update("fill_circle", move |grid| {
            grid.fill_circle(center, radius, value);
            Ok(())
        })
    }

    /// Fills an axis-aligned rectangle, clipped to the grid.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn fill_rect(
        &self,
        x: isize,
        y: isize,
        width: usize,
        height: usize,
        value: T,
    ) -> PipelineResult<usize> {
        self.update("fill_rect", move |grid| {
            grid.fill_rect(x, y, width, height, value);
            Ok(())
        })
    }

    /// Nearest-neighbour rescale. Grids derived afterwards are declared
    /// with the new size.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Grid`] for a zero size, or the protocol
    /// errors of [`Pipeline::add`].
    #[track_caller]
    pub fn resize(&self, size: usize) -> PipelineResult<usize> {
        if size == 0 {
            return Err(GridError::InvalidSize(size).into());
        }
        let index = self.update("resize", move |grid| grid.resize(size))?;
        self.pipeline.set_size(self.id, size)?;
        Ok(index)
    }

    /// Records a copy of this grid under a new name.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn copy_as(&self, name: impl Into<String>) -> PipelineResult<Tracked<'p, T>> {
        self.derive(name, "copy_as", |grid| Ok(grid.clone()))
    }
}

impl<'p, T: RegistryCell> Tracked<'p, T> {
    /// Records a registry operation by id.
    ///
    /// Arity, source kinds and symmetry compatibility are checked now.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownOperation`], [`PipelineError::Arity`],
    /// [`PipelineError::TypeMismatch`], a symmetry mismatch, or the protocol
    /// errors of [`Pipeline::add`].
    #[track_caller]
    pub fn apply(
        &self,
        operation: &str,
        params: &[f32],
        sources: &[GridId],
        symmetry_type: SymmetryType,
    ) -> PipelineResult<usize> {
        self.apply_as(operation, operation, params, sources, symmetry_type)
    }

    /// [`Tracked::apply`] recorded under `method` instead of the operation id.
    #[track_caller]
    pub(crate) fn apply_as(
        &self,
        method: &str,
        operation: &str,
        params: &[f32],
        sources: &[GridId],
        symmetry_type: SymmetryType,
    ) -> PipelineResult<usize> {
        let operation = T::operation(operation)?;
        operation.check_arity(params.len(), sources.len())?;
        for (&source, &expected) in sources.iter().zip(operation.sources) {
            let actual = self.pipeline.info(source)?.kind;
            if actual != expected {
                return Err(PipelineError::TypeMismatch {
                    grid: source,
                    expected,
                    actual,
                });
            }
            self.pipeline.check_compatible(self.id, source)?;
        }

        let resized = if operation.id == "resize" {
            params.first().and_then(|&size| to_usize(size, "size").ok())
        } else {
            None
        };
        let params = params.to_vec();
        let index = self.update_with(method, sources, move |grid, inputs| {
            operation.invoke(
                grid,
                &OperationArgs {
                    params: &params,
                    sources: inputs,
                    symmetry_type,
                },
            )
        })?;
        if let Some(size) = resized.filter(|&size| size > 0) {
            self.pipeline.set_size(self.id, size)?;
        }
        Ok(index)
    }
}

impl<'p> Tracked<'p, bool> {
    /// See [`tessera_core::BooleanGrid::randomize`].
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn randomize(&self, density: f32, symmetry_type: SymmetryType) -> PipelineResult<usize> {
        self.update("randomize", move |grid| grid.randomize(density, symmetry_type))
    }

    /// See [`tessera_core::BooleanGrid::erode`].
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn erode(
        &self,
        strength: f32,
        symmetry_type: SymmetryType,
        iterations: usize,
    ) -> PipelineResult<usize> {
        self.update("erode", move |grid| grid.erode(strength, symmetry_type, iterations))
    }

    /// Majority smoothing.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn smooth(&self, radius: f32, density: f32) -> PipelineResult<usize> {
        self.update("smooth", move |grid| grid.smooth(radius, density))
    }

    /// Circular dilation.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn inflate(&self, radius: f32) -> PipelineResult<usize> {
        self.update("inflate", move |grid| grid.inflate(radius))
    }

    /// Circular erosion.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn deflate(&self, radius: f32) -> PipelineResult<usize> {
        self.update("deflate", move |grid| grid.deflate(radius))
    }

    /// Punches random holes.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn acid(&self, strength: f32, size: f32) -> PipelineResult<usize> {
        self.update("acid", move |grid| grid.acid(strength, size))
    }

    /// Union with `other`.
    ///
    /// # Errors
    ///
    /// Returns a symmetry mismatch or the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn combine(&self, other: &Tracked<'p, bool>) -> PipelineResult<usize> {
        self.with_source("combine", other, |grid, other| grid.combine(other))
    }

    /// Intersection with `other`.
    ///
    /// # Errors
    ///
    /// Returns a symmetry mismatch or the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn intersect(&self, other: &Tracked<'p, bool>) -> PipelineResult<usize> {
        self.with_source("intersect", other, |grid, other| grid.intersect(other))
    }

    /// Removes the cells set in `other`.
    ///
    /// # Errors
    ///
    /// Returns a symmetry mismatch or the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn minus(&self, other: &Tracked<'p, bool>) -> PipelineResult<usize> {
        self.with_source("minus", other, |grid, other| grid.minus(other))
    }

    /// Flips every cell.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn invert(&self) -> PipelineResult<usize> {
        self.update("invert", |grid| {
            grid.invert();
            Ok(())
        })
    }

    /// New float grid with `high` where set and `low` elsewhere.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn to_float(&self, name: impl Into<String>, low: f32, high: f32) -> PipelineResult<Tracked<'p, f32>> {
        self.derive(name, "to_float", move |grid| Ok(FloatGrid::from_boolean(grid, low, high)))
    }
}

impl<'p> Tracked<'p, f32> {
    /// Elementwise sum.
    ///
    /// # Errors
    ///
    /// Returns a symmetry mismatch or the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn add(&self, other: &Tracked<'p, f32>) -> PipelineResult<usize> {
        self.with_source("add", other, |grid, other| grid.add(other))
    }

    /// Elementwise difference.
    ///
    /// # Errors
    ///
    /// Returns a symmetry mismatch or the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn subtract(&self, other: &Tracked<'p, f32>) -> PipelineResult<usize> {
        self.with_source("subtract", other, |grid, other| grid.subtract(other))
    }

    /// Elementwise product.
    ///
    /// # Errors
    ///
    /// Returns a symmetry mismatch or the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn multiply(&self, other: &Tracked<'p, f32>) -> PipelineResult<usize> {
        self.with_source("multiply", other, |grid, other| grid.multiply(other))
    }

    /// Adds a constant.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn add_scalar(&self, value: f32) -> PipelineResult<usize> {
        self.update("add_scalar", move |grid| {
            grid.add_scalar(value);
            Ok(())
        })
    }

    /// Multiplies every cell by `factor`.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn scale(&self, factor: f32) -> PipelineResult<usize> {
        self.update("scale", move |grid| {
            grid.scale(factor);
            Ok(())
        })
    }

    /// Clamps every cell.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn clamp(&self, min: f32, max: f32) -> PipelineResult<usize> {
        self.update("clamp", move |grid| grid.clamp(min, max))
    }

    /// Symmetric uniform noise in `[-amplitude, amplitude)`.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn add_white_noise(&self, amplitude: f32, symmetry_type: SymmetryType) -> PipelineResult<usize> {
        self.update("add_white_noise", move |grid| {
            grid.add_white_noise(amplitude, symmetry_type)
        })
    }

    /// Disc mean, optionally restricted to the set cells of `limiter`.
    ///
    /// # Errors
    ///
    /// Returns a symmetry mismatch or the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn smooth(&self, radius: f32, limiter: Option<&Tracked<'p, bool>>) -> PipelineResult<usize> {
        match limiter {
            Some(limiter) => self.with_source("smooth", limiter, move |grid, limiter| {
                grid.smooth(radius, Some(limiter))
            }),
            None => self.update("smooth", move |grid| grid.smooth(radius, None)),
        }
    }

    /// Replaces values with slope magnitude.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn gradient(&self) -> PipelineResult<usize> {
        self.update("gradient", |grid| {
            grid.gradient();
            Ok(())
        })
    }

    /// New boolean grid set where `value >= threshold`.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn to_boolean(&self, name: impl Into<String>, threshold: f32) -> PipelineResult<Tracked<'p, bool>> {
        self.derive(name, "to_boolean", move |grid| Ok(grid.to_boolean(threshold)))
    }

    /// New vector grid of per-cell gradients.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn gradient_vectors(&self, name: impl Into<String>) -> PipelineResult<Tracked<'p, Vector2>> {
        self.derive(name, "gradient_vectors", |grid| Ok(VectorGrid::from_gradient(grid)))
    }
}

impl<'p> Tracked<'p, Vector2> {
    /// Normalizes every non-zero vector.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn normalize(&self) -> PipelineResult<usize> {
        self.update("normalize", |grid| {
            grid.normalize();
            Ok(())
        })
    }

    /// Multiplies every vector by `factor`.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn scale(&self, factor: f32) -> PipelineResult<usize> {
        self.update("scale", move |grid| {
            grid.scale(factor);
            Ok(())
        })
    }

    /// Elementwise sum.
    ///
    /// # Errors
    ///
    /// Returns a symmetry mismatch or the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn add(&self, other: &Tracked<'p, Vector2>) -> PipelineResult<usize> {
        self.with_source("add", other, |grid, other| grid.add(other))
    }

    /// New float grid of vector lengths.
    ///
    /// # Errors
    ///
    /// Returns the protocol errors of [`Pipeline::add`].
    #[track_caller]
    pub fn magnitude(&self, name: impl Into<String>) -> PipelineResult<Tracked<'p, f32>> {
        self.derive(name, "magnitude", |grid| Ok(grid.magnitude()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use tessera_core::{BooleanGrid, GridSeed, Symmetry, SymmetrySettings};

    fn mask(name: &str, symmetry: Symmetry) -> BooleanGrid {
        let settings = SymmetrySettings::uniform(symmetry).unwrap();
        BooleanGrid::new(32, GridSeed::new(5).derive_named(name), settings, name).unwrap()
    }

    #[test]
    fn test_typed_roundtrip() {
        let pipeline = Pipeline::new(PipelineConfig::default().with_workers(2));
        let land = pipeline.track(mask("land", Symmetry::Quad)).unwrap();
        land.randomize(0.5, SymmetryType::Terrain).unwrap();
        let height = land.to_float("height", 0.0, 1.0).unwrap();
        pipeline.start().unwrap();

        let land = land.wait().unwrap();
        let height = height.wait().unwrap();
        assert_eq!(height.name(), "height");
        assert_eq!(BooleanGrid::from_threshold(&height, 0.5).cells(), land.cells());
    }

    #[test]
    fn test_mismatched_symmetry_rejected_synchronously() {
        let pipeline = Pipeline::default();
        let a = pipeline.track(mask("a", Symmetry::Quad)).unwrap();
        let b = pipeline.track(mask("b", Symmetry::Point(2))).unwrap();
        assert!(matches!(a.combine(&b), Err(PipelineError::Grid(_))));
        assert_eq!(pipeline.entry_count(), 0);
    }

    #[test]
    fn test_tracked_checks_kind() {
        let pipeline = Pipeline::default();
        let land = pipeline.track(mask("land", Symmetry::None)).unwrap();
        assert!(pipeline.tracked::<bool>(land.id()).is_ok());
        assert!(matches!(
            pipeline.tracked::<f32>(land.id()),
            Err(PipelineError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_apply_validates_before_recording() {
        let pipeline = Pipeline::default();
        let land = pipeline.track(mask("land", Symmetry::None)).unwrap();
        let height = land.to_float("height", 0.0, 1.0).unwrap();
        assert!(matches!(
            land.apply("erode", &[0.5], &[], SymmetryType::Terrain),
            Err(PipelineError::Arity { .. })
        ));
        assert!(matches!(
            land.apply("combine", &[], &[height.id()], SymmetryType::Terrain),
            Err(PipelineError::TypeMismatch { .. })
        ));
        assert!(matches!(
            land.apply("blur", &[], &[], SymmetryType::Terrain),
            Err(PipelineError::UnknownOperation(_))
        ));
        assert_eq!(pipeline.entry_count(), 1);
    }

    #[test]
    fn test_resize_updates_declared_size() {
        let pipeline = Pipeline::default();
        let land = pipeline.track(mask("land", Symmetry::Point(2))).unwrap();
        land.randomize(0.5, SymmetryType::Terrain).unwrap();
        land.resize(8).unwrap();
        assert_eq!(land.info().unwrap().size, 8);
        let height = land.to_float("height", 0.0, 1.0).unwrap();
        assert_eq!(height.info().unwrap().size, 8);

        land.apply("resize", &[12.0], &[], SymmetryType::Terrain).unwrap();
        assert_eq!(land.info().unwrap().size, 12);
        assert!(matches!(land.resize(0), Err(PipelineError::Grid(_))));

        pipeline.start().unwrap();
        assert_eq!(height.wait().unwrap().size(), 8);
        assert_eq!(land.wait().unwrap().size(), 12);
    }

    #[test]
    fn test_float_scale_matches_direct_call() {
        let pipeline = Pipeline::default();
        let land = pipeline.track(mask("land", Symmetry::Quad)).unwrap();
        land.randomize(0.5, SymmetryType::Terrain).unwrap();
        let height = land.to_float("height", 0.0, 2.0).unwrap();
        height.scale(0.25).unwrap();
        pipeline.start().unwrap();

        let land = land.wait().unwrap();
        let mut expected = FloatGrid::from_boolean(&land, 0.0, 2.0);
        expected.scale(0.25);
        assert_eq!(height.wait().unwrap().cells(), expected.cells());
    }

    #[test]
    fn test_apply_records_operation_id() {
        let pipeline = Pipeline::new(PipelineConfig::default().with_determinism_log());
        let land = pipeline.track(mask("land", Symmetry::Point(2))).unwrap();
        land.apply("randomize", &[0.3], &[], SymmetryType::Terrain).unwrap();
        pipeline.start().unwrap();
        pipeline.join().unwrap();
        let lines = pipeline.determinism_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("\tland\trandomize"));
        assert!(lines[0].contains("tracked.rs:"));
    }
}
