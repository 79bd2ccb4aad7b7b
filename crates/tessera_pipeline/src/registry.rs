//! # Operation Registry
//!
//! Static tables mapping operation ids to typed grid handlers, so graphs can
//! be described as data (see [`crate::description`]) and replayed.
//!
//! An operation mutates a grid of one kind in place. It takes a fixed number
//! of numeric parameters and a fixed list of source grids:
//!
//! ```text
//!   id            kind     parameters                          sources
//!   randomize     boolean  density                             -
//!   erode         boolean  strength, iterations                -
//!   combine       boolean  -                                   boolean
//!   smooth        float    radius                              -
//!   smooth_limited float   radius                              boolean
//! ```
//!
//! A conversion reads a grid of one kind and produces a grid of another
//! (`to_float`, `to_boolean`, `gradient_vectors`, `magnitude`).

use std::sync::Arc;

use tessera_core::{BooleanGrid, FloatGrid, Grid, GridError, SymmetryType, Vector2, VectorGrid};

use crate::error::{NodeError, PipelineError, PipelineResult};
use crate::snapshot::{downcast_ref, GridKind, GridSnapshot, KindedCell, SharedSnapshot};

/// Inputs handed to an operation handler.
#[derive(Clone, Copy, Debug)]
pub struct OperationArgs<'a> {
    /// Numeric parameters, already arity-checked.
    pub params: &'a [f32],
    /// Source grid snapshots, already arity-checked.
    pub sources: &'a [SharedSnapshot],
    /// Symmetry class for operations that propagate.
    pub symmetry_type: SymmetryType,
}

impl OperationArgs<'_> {
    fn source<T: KindedCell>(&self, index: usize) -> Result<&Grid<T>, NodeError> {
        downcast_ref::<T>(self.sources[index].as_ref())
    }

    fn count(&self, index: usize, name: &'static str) -> Result<usize, NodeError> {
        to_usize(self.params[index], name)
    }

    fn offset(&self, index: usize, name: &'static str) -> Result<isize, NodeError> {
        to_isize(self.params[index], name)
    }
}

/// In-place grid mutation.
pub type Handler<T> = fn(&mut Grid<T>, &OperationArgs<'_>) -> Result<(), NodeError>;

/// One registered in-place operation.
pub struct Operation<T: KindedCell> {
    /// Registry id.
    pub id: &'static str,
    /// Parameter names, in order.
    pub parameters: &'static [&'static str],
    /// Kinds of the source grids, in order.
    pub sources: &'static [GridKind],
    handler: Handler<T>,
}

impl<T: KindedCell> Operation<T> {
    /// Checks parameter and source counts against the declaration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Arity`].
    pub fn check_arity(&self, params: usize, sources: usize) -> PipelineResult<()> {
        arity(self.id, "parameters", self.parameters.len(), params)?;
        arity(self.id, "sources", self.sources.len(), sources)
    }

    /// Runs the handler on `grid`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InputCount`] when the argument counts are off and
    /// whatever the handler returns otherwise.
    pub fn invoke(&self, grid: &mut Grid<T>, args: &OperationArgs<'_>) -> Result<(), NodeError> {
        for (expected, actual) in [
            (self.parameters.len(), args.params.len()),
            (self.sources.len(), args.sources.len()),
        ] {
            if expected != actual {
                return Err(NodeError::InputCount { expected, actual });
            }
        }
        (self.handler)(grid, args)
    }
}

/// Conversion handler: reads one grid, returns a grid of another kind.
pub type ConversionHandler =
    fn(&dyn GridSnapshot, &[f32], &str) -> Result<SharedSnapshot, NodeError>;

/// One registered kind-changing conversion.
pub struct Conversion {
    /// Registry id.
    pub id: &'static str,
    /// Input kind.
    pub from: GridKind,
    /// Output kind.
    pub to: GridKind,
    /// Parameter names, in order.
    pub parameters: &'static [&'static str],
    handler: ConversionHandler,
}

impl Conversion {
    /// Checks the parameter count against the declaration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Arity`].
    pub fn check_arity(&self, params: usize) -> PipelineResult<()> {
        arity(self.id, "parameters", self.parameters.len(), params)
    }

    /// Runs the conversion and names the output `name`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InputCount`] or a type mismatch on the input.
    pub fn invoke(
        &self,
        input: &dyn GridSnapshot,
        params: &[f32],
        name: &str,
    ) -> Result<SharedSnapshot, NodeError> {
        if params.len() != self.parameters.len() {
            return Err(NodeError::InputCount {
                expected: self.parameters.len(),
                actual: params.len(),
            });
        }
        (self.handler)(input, params, name)
    }
}

fn arity(operation: &str, what: &'static str, expected: usize, actual: usize) -> PipelineResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(PipelineError::Arity {
            operation: operation.to_owned(),
            what,
            expected,
            actual,
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_usize(value: f32, name: &'static str) -> Result<usize, NodeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value.round() as usize)
    } else {
        Err(GridError::InvalidParameter {
            name,
            reason: format!("expected a non-negative count, got {value}"),
        }
        .into())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_isize(value: f32, name: &'static str) -> Result<isize, NodeError> {
    if value.is_finite() {
        Ok(value.round() as isize)
    } else {
        Err(GridError::InvalidParameter {
            name,
            reason: format!("expected a finite offset, got {value}"),
        }
        .into())
    }
}

/// Cell types with a registry table.
pub trait RegistryCell: KindedCell {
    /// Every operation for this kind.
    fn operations() -> &'static [Operation<Self>];

    /// Looks up one operation.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownOperation`].
    fn operation(id: &str) -> PipelineResult<&'static Operation<Self>> {
        Self::operations()
            .iter()
            .find(|op| op.id == id)
            .ok_or_else(|| PipelineError::UnknownOperation(format!("{}.{id}", Self::KIND)))
    }
}

impl RegistryCell for bool {
    fn operations() -> &'static [Operation<Self>] {
        BOOLEAN_OPERATIONS
    }
}

impl RegistryCell for f32 {
    fn operations() -> &'static [Operation<Self>] {
        FLOAT_OPERATIONS
    }
}

impl RegistryCell for Vector2 {
    fn operations() -> &'static [Operation<Self>] {
        VECTOR_OPERATIONS
    }
}

/// Entry point for id lookups when the kind is only known at runtime.
pub struct OperationRegistry;

impl OperationRegistry {
    /// Whether an in-place operation `id` exists for `kind`.
    #[must_use]
    pub fn contains(kind: GridKind, id: &str) -> bool {
        Self::ids(kind).contains(&id)
    }

    /// Ids of every in-place operation for `kind`.
    #[must_use]
    pub fn ids(kind: GridKind) -> Vec<&'static str> {
        match kind {
            GridKind::Boolean => BOOLEAN_OPERATIONS.iter().map(|op| op.id).collect(),
            GridKind::Float => FLOAT_OPERATIONS.iter().map(|op| op.id).collect(),
            GridKind::Vector => VECTOR_OPERATIONS.iter().map(|op| op.id).collect(),
        }
    }

    /// Looks up a conversion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownOperation`].
    pub fn conversion(id: &str) -> PipelineResult<&'static Conversion> {
        CONVERSIONS
            .iter()
            .find(|conversion| conversion.id == id)
            .ok_or_else(|| PipelineError::UnknownOperation(id.to_owned()))
    }
}

// Boolean handlers

fn bool_randomize(grid: &mut BooleanGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.randomize(args.params[0], args.symmetry_type)?)
}

fn bool_erode(grid: &mut BooleanGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    let iterations = args.count(1, "iterations")?;
    Ok(grid.erode(args.params[0], args.symmetry_type, iterations)?)
}

fn bool_smooth(grid: &mut BooleanGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.smooth(args.params[0], args.params[1])?)
}

fn bool_inflate(grid: &mut BooleanGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.inflate(args.params[0])?)
}

fn bool_deflate(grid: &mut BooleanGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.deflate(args.params[0])?)
}

fn bool_acid(grid: &mut BooleanGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.acid(args.params[0], args.params[1])?)
}

fn bool_fill_circle(grid: &mut BooleanGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    let p = args.params;
    grid.fill_circle(Vector2::new(p[0], p[1]), p[2], p[3] != 0.0);
    Ok(())
}

fn bool_fill_rect(grid: &mut BooleanGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    grid.fill_rect(
        args.offset(0, "x")?,
        args.offset(1, "y")?,
        args.count(2, "width")?,
        args.count(3, "height")?,
        args.params[4] != 0.0,
    );
    Ok(())
}

fn bool_fill_parallelogram(
    grid: &mut BooleanGrid,
    args: &OperationArgs<'_>,
) -> Result<(), NodeError> {
    let p = args.params;
    grid.fill_parallelogram(
        args.offset(0, "x")?,
        args.offset(1, "y")?,
        args.count(2, "width")?,
        args.count(3, "height")?,
        p[4],
        p[5],
        p[6] != 0.0,
    );
    Ok(())
}

fn bool_combine(grid: &mut BooleanGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.combine(args.source::<bool>(0)?)?)
}

fn bool_intersect(grid: &mut BooleanGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.intersect(args.source::<bool>(0)?)?)
}

fn bool_minus(grid: &mut BooleanGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.minus(args.source::<bool>(0)?)?)
}

fn bool_invert(grid: &mut BooleanGrid, _: &OperationArgs<'_>) -> Result<(), NodeError> {
    grid.invert();
    Ok(())
}

// Float handlers

fn float_add(grid: &mut FloatGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.add(args.source::<f32>(0)?)?)
}

fn float_subtract(grid: &mut FloatGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.subtract(args.source::<f32>(0)?)?)
}

fn float_multiply(grid: &mut FloatGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.multiply(args.source::<f32>(0)?)?)
}

fn float_add_scalar(grid: &mut FloatGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    grid.add_scalar(args.params[0]);
    Ok(())
}

fn float_scale(grid: &mut FloatGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    grid.scale(args.params[0]);
    Ok(())
}

fn float_clamp(grid: &mut FloatGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.clamp(args.params[0], args.params[1])?)
}

fn float_white_noise(grid: &mut FloatGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.add_white_noise(args.params[0], args.symmetry_type)?)
}

fn float_smooth(grid: &mut FloatGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.smooth(args.params[0], None)?)
}

fn float_smooth_limited(grid: &mut FloatGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.smooth(args.params[0], Some(args.source::<bool>(0)?))?)
}

fn float_gradient(grid: &mut FloatGrid, _: &OperationArgs<'_>) -> Result<(), NodeError> {
    grid.gradient();
    Ok(())
}

// Vector handlers

fn vector_normalize(grid: &mut VectorGrid, _: &OperationArgs<'_>) -> Result<(), NodeError> {
    grid.normalize();
    Ok(())
}

fn vector_scale(grid: &mut VectorGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    grid.scale(args.params[0]);
    Ok(())
}

fn vector_add(grid: &mut VectorGrid, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.add(args.source::<Vector2>(0)?)?)
}

// Shared across kinds

fn resize<T: KindedCell>(grid: &mut Grid<T>, args: &OperationArgs<'_>) -> Result<(), NodeError> {
    Ok(grid.resize(args.count(0, "size")?)?)
}

fn apply_symmetry<T: KindedCell>(
    grid: &mut Grid<T>,
    args: &OperationArgs<'_>,
) -> Result<(), NodeError> {
    grid.apply_symmetry(args.symmetry_type);
    Ok(())
}

const fn op<T: KindedCell>(
    id: &'static str,
    parameters: &'static [&'static str],
    sources: &'static [GridKind],
    handler: Handler<T>,
) -> Operation<T> {
    Operation {
        id,
        parameters,
        sources,
        handler,
    }
}

const BOOLEAN: &[GridKind] = &[GridKind::Boolean];
const FLOAT: &[GridKind] = &[GridKind::Float];
const VECTOR: &[GridKind] = &[GridKind::Vector];

static BOOLEAN_OPERATIONS: &[Operation<bool>] = &[
    op("randomize", &["density"], &[], bool_randomize),
    op("erode", &["strength", "iterations"], &[], bool_erode),
    op("smooth", &["radius", "density"], &[], bool_smooth),
    op("inflate", &["radius"], &[], bool_inflate),
    op("deflate", &["radius"], &[], bool_deflate),
    op("acid", &["strength", "size"], &[], bool_acid),
    op("fill_circle", &["x", "y", "radius", "value"], &[], bool_fill_circle),
    op("fill_rect", &["x", "y", "width", "height", "value"], &[], bool_fill_rect),
    op(
        "fill_parallelogram",
        &["x", "y", "width", "height", "x_slope", "y_slope", "value"],
        &[],
        bool_fill_parallelogram,
    ),
    op("combine", &[], BOOLEAN, bool_combine),
    op("intersect", &[], BOOLEAN, bool_intersect),
    op("minus", &[], BOOLEAN, bool_minus),
    op("invert", &[], &[], bool_invert),
    op("resize", &["size"], &[], resize::<bool>),
    op("apply_symmetry", &[], &[], apply_symmetry::<bool>),
];

static FLOAT_OPERATIONS: &[Operation<f32>] = &[
    op("add", &[], FLOAT, float_add),
    op("subtract", &[], FLOAT, float_subtract),
    op("multiply", &[], FLOAT, float_multiply),
    op("add_scalar", &["value"], &[], float_add_scalar),
    op("scale", &["factor"], &[], float_scale),
    op("clamp", &["min", "max"], &[], float_clamp),
    op("add_white_noise", &["amplitude"], &[], float_white_noise),
    op("smooth", &["radius"], &[], float_smooth),
    op("smooth_limited", &["radius"], BOOLEAN, float_smooth_limited),
    op("gradient", &[], &[], float_gradient),
    op("resize", &["size"], &[], resize::<f32>),
    op("apply_symmetry", &[], &[], apply_symmetry::<f32>),
];

static VECTOR_OPERATIONS: &[Operation<Vector2>] = &[
    op("normalize", &[], &[], vector_normalize),
    op("scale", &["factor"], &[], vector_scale),
    op("add", &[], VECTOR, vector_add),
    op("resize", &["size"], &[], resize::<Vector2>),
];

fn named<T: KindedCell>(mut grid: Grid<T>, name: &str) -> SharedSnapshot {
    grid.set_name(name);
    Arc::new(grid)
}

fn to_float(
    input: &dyn GridSnapshot,
    params: &[f32],
    name: &str,
) -> Result<SharedSnapshot, NodeError> {
    let source = downcast_ref::<bool>(input)?;
    Ok(named(FloatGrid::from_boolean(source, params[0], params[1]), name))
}

fn to_boolean(
    input: &dyn GridSnapshot,
    params: &[f32],
    name: &str,
) -> Result<SharedSnapshot, NodeError> {
    let source = downcast_ref::<f32>(input)?;
    Ok(named(source.to_boolean(params[0]), name))
}

fn gradient_vectors(
    input: &dyn GridSnapshot,
    _: &[f32],
    name: &str,
) -> Result<SharedSnapshot, NodeError> {
    let source = downcast_ref::<f32>(input)?;
    Ok(named(VectorGrid::from_gradient(source), name))
}

fn magnitude(input: &dyn GridSnapshot, _: &[f32], name: &str) -> Result<SharedSnapshot, NodeError> {
    let source = downcast_ref::<Vector2>(input)?;
    Ok(named(source.magnitude(), name))
}

static CONVERSIONS: &[Conversion] = &[
    Conversion {
        id: "to_float",
        from: GridKind::Boolean,
        to: GridKind::Float,
        parameters: &["low", "high"],
        handler: to_float,
    },
    Conversion {
        id: "to_boolean",
        from: GridKind::Float,
        to: GridKind::Boolean,
        parameters: &["threshold"],
        handler: to_boolean,
    },
    Conversion {
        id: "gradient_vectors",
        from: GridKind::Float,
        to: GridKind::Vector,
        parameters: &[],
        handler: gradient_vectors,
    },
    Conversion {
        id: "magnitude",
        from: GridKind::Vector,
        to: GridKind::Float,
        parameters: &[],
        handler: magnitude,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{GridSeed, Symmetry, SymmetrySettings};

    fn mask() -> BooleanGrid {
        let settings = SymmetrySettings::uniform(Symmetry::Point(2)).unwrap();
        BooleanGrid::new(16, GridSeed::new(9), settings, "land").unwrap()
    }

    fn args<'a>(params: &'a [f32], sources: &'a [SharedSnapshot]) -> OperationArgs<'a> {
        OperationArgs {
            params,
            sources,
            symmetry_type: SymmetryType::Terrain,
        }
    }

    #[test]
    fn test_ids_unique_per_kind() {
        for kind in [GridKind::Boolean, GridKind::Float, GridKind::Vector] {
            let mut ids = OperationRegistry::ids(kind);
            let total = ids.len();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), total, "duplicate id for {kind}");
        }
    }

    #[test]
    fn test_lookup() {
        assert!(bool::operation("erode").is_ok());
        assert!(OperationRegistry::contains(GridKind::Float, "smooth_limited"));
        assert!(matches!(
            f32::operation("erode"),
            Err(PipelineError::UnknownOperation(id)) if id == "float.erode"
        ));
        assert_eq!(OperationRegistry::conversion("to_float").unwrap().to, GridKind::Float);
    }

    #[test]
    fn test_arity_checked() {
        let erode = bool::operation("erode").unwrap();
        assert!(erode.check_arity(2, 0).is_ok());
        assert!(matches!(
            erode.check_arity(1, 0),
            Err(PipelineError::Arity { what: "parameters", expected: 2, actual: 1, .. })
        ));
        let mut grid = mask();
        assert_eq!(
            erode.invoke(&mut grid, &args(&[0.5], &[])),
            Err(NodeError::InputCount { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn test_invoke_matches_direct_call() {
        let mut direct = mask();
        direct.randomize(0.4, SymmetryType::Terrain).unwrap();

        let mut via_registry = mask();
        bool::operation("randomize")
            .unwrap()
            .invoke(&mut via_registry, &args(&[0.4], &[]))
            .unwrap();
        assert_eq!(direct.content_hash(), via_registry.content_hash());
    }

    #[test]
    fn test_source_kind_checked() {
        let mut grid = mask();
        let wrong: SharedSnapshot = Arc::new(FloatGrid::from_boolean(&grid, 0.0, 1.0));
        let err = bool::operation("combine")
            .unwrap()
            .invoke(&mut grid, &args(&[], &[wrong]))
            .unwrap_err();
        assert!(matches!(err, NodeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut grid = mask();
        let err = bool::operation("erode")
            .unwrap()
            .invoke(&mut grid, &args(&[0.5, -1.0], &[]))
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::Grid(GridError::InvalidParameter { name: "iterations", .. })
        ));
    }

    #[test]
    fn test_conversion_output_kind() {
        let input: SharedSnapshot = Arc::new(mask());
        let conversion = OperationRegistry::conversion("to_float").unwrap();
        let output = conversion.invoke(input.as_ref(), &[-1.0, 1.0], "height").unwrap();
        assert_eq!(output.kind(), conversion.to);
        assert_eq!(output.debug_name(), "height");
        assert_eq!(output.symmetry_settings(), input.symmetry_settings());
    }
}
