//! End-to-end grid scenarios: determinism, set algebra, conversions.

use tessera_core::{
    BooleanGrid, FloatGrid, GridError, GridSeed, Symmetry, SymmetrySettings, SymmetryType,
};

fn point2(size: usize, seed: u64) -> BooleanGrid {
    let settings = SymmetrySettings::uniform(Symmetry::Point(2)).unwrap();
    BooleanGrid::new(size, GridSeed::new(seed), settings, "land").unwrap()
}

fn randomized_then_eroded(seed: u64) -> BooleanGrid {
    let mut grid = point2(512, seed);
    grid.randomize(0.1, SymmetryType::Terrain).unwrap();
    grid.erode(0.5, SymmetryType::Terrain, 1).unwrap();
    grid
}

#[test]
fn test_point2_randomize_erode_is_reproducible() {
    let first = randomized_then_eroded(0x5EED);
    let second = randomized_then_eroded(0x5EED);

    assert_eq!(first.cells(), second.cells());
    assert_eq!(first.content_hash(), second.content_hash());

    for y in 0..512 {
        for x in 0..512 {
            assert_eq!(first.get(x, y), first.get(511 - x, 511 - y), "({x}, {y})");
        }
    }

    let other_seed = randomized_then_eroded(0x5EED + 1);
    assert_ne!(first.content_hash(), other_seed.content_hash());
}

#[test]
fn test_erosion_shrinks_land() {
    let mut grid = point2(128, 3);
    grid.randomize(0.6, SymmetryType::Terrain).unwrap();
    let before = grid.count();
    grid.erode(0.5, SymmetryType::Terrain, 2).unwrap();
    assert!(grid.count() < before);
}

#[test]
fn test_boolean_algebra_idempotence() {
    let mut base = point2(64, 12);
    base.randomize(0.45, SymmetryType::Terrain).unwrap();

    let mut union = base.copy_as("union");
    union.combine(&base).unwrap();
    assert_eq!(union.cells(), base.cells());

    let mut intersection = base.copy_as("intersection");
    intersection.intersect(&base).unwrap();
    assert_eq!(intersection.cells(), base.cells());

    let mut difference = base.copy_as("difference");
    difference.minus(&base).unwrap();
    assert_eq!(difference.count(), 0);
}

#[test]
fn test_boolean_float_round_trip() {
    let mut mask = point2(48, 4);
    mask.randomize(0.5, SymmetryType::Terrain).unwrap();

    let field = FloatGrid::from_boolean(&mask, -2.0, 6.0);
    assert_eq!(field.symmetry_settings(), mask.symmetry_settings());
    let back = field.to_boolean(2.0);

    assert_eq!(back.cells(), mask.cells());
}

#[test]
fn test_smooth_and_gradient_keep_symmetry() {
    let settings = SymmetrySettings::uniform(Symmetry::Quad).unwrap();
    let mut mask = BooleanGrid::new(40, GridSeed::new(8), settings, "hills").unwrap();
    mask.randomize(0.3, SymmetryType::Terrain).unwrap();

    let mut heights = FloatGrid::from_boolean(&mask, 0.0, 1.0);
    heights.smooth(3.0, None).unwrap();
    heights.gradient();
    assert!(heights.is_symmetric(SymmetryType::Terrain));
    assert!(heights.max() > 0.0);
}

#[test]
fn test_mismatched_operands_fail_synchronously() {
    let mut land = point2(32, 1);
    let quad = BooleanGrid::new(
        32,
        GridSeed::new(1),
        SymmetrySettings::uniform(Symmetry::Quad).unwrap(),
        "quad",
    )
    .unwrap();

    let before = land.cells().to_vec();
    let err = land.intersect(&quad).unwrap_err();
    assert!(matches!(err, GridError::SymmetryMismatch { .. }));
    assert_eq!(land.cells(), before.as_slice());
}
