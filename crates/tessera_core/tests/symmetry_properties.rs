//! Canonical coverage and closure across every symmetry class.

use tessera_core::{
    BooleanGrid, GridSeed, Symmetry, SymmetryResolver, SymmetrySettings, SymmetryType,
};

const EXACT_CLASSES: [Symmetry; 9] = [
    Symmetry::None,
    Symmetry::Point(2),
    Symmetry::Point(4),
    Symmetry::MirrorX,
    Symmetry::MirrorZ,
    Symmetry::MirrorXZ,
    Symmetry::MirrorZX,
    Symmetry::Quad,
    Symmetry::DiagonalQuad,
];

#[test]
fn test_exact_classes_cover_every_orbit_once() {
    for symmetry in EXACT_CLASSES {
        for size in [1, 2, 7, 8, 31, 64] {
            let resolver = SymmetryResolver::new(symmetry, size);
            let region = resolver.region();
            for y in 0..size {
                for x in 0..size {
                    let canonical = std::iter::once((x, y))
                        .chain(resolver.counterparts(x, y))
                        .filter(|&(cx, cy)| region.contains(cx, cy))
                        .count();
                    assert_eq!(canonical, 1, "{symmetry} size {size} cell ({x}, {y})");
                }
            }
        }
    }
}

#[test]
fn test_wedge_classes_cover_inscribed_disc_approximately() {
    // Rotations off the lattice only map the inscribed disc onto itself
    let size = 96;
    let center = (size as f64 - 1.0) / 2.0;
    let radius_sq = (size as f64 / 2.0).powi(2);
    let disc: Vec<(usize, usize)> = (0..size)
        .flat_map(|y| (0..size).map(move |x| (x, y)))
        .filter(|&(x, y)| (x as f64 - center).powi(2) + (y as f64 - center).powi(2) <= radius_sq)
        .collect();

    for points in [3_u8, 5, 6, 8, 12, 16] {
        let resolver = SymmetryResolver::new(Symmetry::Point(points), size);
        let region = resolver.region();

        let canonical = disc.iter().filter(|&&(x, y)| region.contains(x, y)).count();
        let covered = canonical * usize::from(points);
        assert!(
            covered.abs_diff(disc.len()) * 10 < disc.len(),
            "point{points}: {covered} cells covered, expected about {}",
            disc.len()
        );

        let orphans = disc
            .iter()
            .filter(|&&(x, y)| resolver.source(x, y).is_none())
            .count();
        assert!(orphans * 10 < disc.len(), "point{points}: {orphans} cells without a source");
    }
}

#[test]
fn test_counterparts_are_closed_after_randomize() {
    for symmetry in EXACT_CLASSES {
        let settings = SymmetrySettings::uniform(symmetry).unwrap();
        let mut grid = BooleanGrid::new(33, GridSeed::new(77), settings, "closure").unwrap();
        grid.randomize(0.5, SymmetryType::Terrain).unwrap();

        let resolver = grid.resolver(SymmetryType::Terrain);
        for y in 0..grid.size() {
            for x in 0..grid.size() {
                for (cx, cy) in resolver.counterparts(x, y) {
                    assert_eq!(grid.get(x, y), grid.get(cx, cy), "{symmetry} ({x}, {y})");
                }
            }
        }
    }
}

const WEDGE_FOLDS: [u8; 6] = [3, 5, 6, 8, 12, 16];

#[test]
fn test_wedge_counterparts_are_closed_after_randomize() {
    for points in WEDGE_FOLDS {
        let settings = SymmetrySettings::uniform(Symmetry::Point(points)).unwrap();
        let mut grid = BooleanGrid::new(64, GridSeed::new(77), settings, "wedge").unwrap();
        grid.randomize(0.5, SymmetryType::Terrain).unwrap();
        assert!(grid.is_symmetric(SymmetryType::Terrain), "point{points}");

        let resolver = grid.resolver(SymmetryType::Terrain);
        for y in 0..grid.size() {
            for x in 0..grid.size() {
                for (cx, cy) in resolver.counterparts(x, y) {
                    assert_eq!(
                        grid.get(x, y),
                        grid.get(cx, cy),
                        "point{points} ({x}, {y}) vs ({cx}, {cy})"
                    );
                }
            }
        }
    }
}

#[test]
fn test_wedge_classes_keep_exact_rotations() {
    for points in [6_u8, 8, 10, 12, 16] {
        for size in [33, 64] {
            let last = size - 1;
            let settings = SymmetrySettings::uniform(Symmetry::Point(points)).unwrap();
            let mut grid = BooleanGrid::new(size, GridSeed::new(78), settings, "turns").unwrap();
            grid.randomize(0.5, SymmetryType::Terrain).unwrap();
            let resolver = grid.resolver(SymmetryType::Terrain);

            for y in 0..size {
                for x in 0..size {
                    let antipode = (last - x, last - y);
                    assert_eq!(grid.get(x, y), grid.get(antipode.0, antipode.1), "point{points} ({x}, {y})");
                    if antipode != (x, y) {
                        assert!(resolver.counterparts(x, y).contains(&antipode));
                    }
                    if points % 4 == 0 {
                        assert_eq!(grid.get(x, y), grid.get(last - y, x), "point{points} ({x}, {y})");
                    }
                }
            }
        }
    }
}

#[test]
fn test_team_symmetry_is_selectable() {
    let settings =
        SymmetrySettings::new(Symmetry::Quad, Symmetry::Point(2), Symmetry::Quad).unwrap();
    let mut grid = BooleanGrid::new(20, GridSeed::new(5), settings, "teams").unwrap();
    grid.randomize(0.5, SymmetryType::Team).unwrap();

    assert!(grid.is_symmetric(SymmetryType::Team));
    assert_eq!(grid.get(2, 3), grid.get(17, 16));
}
