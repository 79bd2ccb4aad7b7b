//! Benchmark for scheduling overhead and a realistic branching graph.
//!
//! TARGET: 1000 trivial nodes scheduled and drained under 20ms
//!
//! Run with: cargo bench --package tessera_pipeline --bench pipeline_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tessera_core::{BooleanGrid, GridSeed, Symmetry, SymmetrySettings, SymmetryType};
use tessera_pipeline::{Pipeline, PipelineConfig};

fn mask(name: &str, size: usize) -> BooleanGrid {
    let settings = SymmetrySettings::uniform(Symmetry::Point(2)).expect("valid symmetry");
    BooleanGrid::new(size, GridSeed::new(42).derive_named(name), settings, name)
        .expect("valid size")
}

fn benchmark_overhead(c: &mut Criterion) {
    c.bench_function("schedule_1000_chained_nodes", |b| {
        b.iter(|| {
            let pipeline = Pipeline::new(PipelineConfig::default().with_workers(4));
            let grid = pipeline.track(mask("tiny", 4)).expect("building");
            for _ in 0..1000 {
                grid.invert().expect("building");
            }
            pipeline.start().expect("first start");
            pipeline.join().expect("no failures");
            black_box(grid.wait().expect("completed"));
        });
    });
}

fn benchmark_branching_graph(c: &mut Criterion) {
    c.bench_function("branching_graph_256", |b| {
        b.iter(|| {
            let pipeline = Pipeline::default();
            let land = pipeline.track(mask("land", 256)).expect("building");
            let lakes = pipeline.track(mask("lakes", 256)).expect("building");
            let hills = pipeline.track(mask("hills", 256)).expect("building");

            land.randomize(0.55, SymmetryType::Terrain).expect("building");
            lakes.randomize(0.1, SymmetryType::Terrain).expect("building");
            hills.randomize(0.3, SymmetryType::Terrain).expect("building");
            land.erode(0.5, SymmetryType::Terrain, 2).expect("building");
            lakes.inflate(2.0).expect("building");
            hills.smooth(3.0, 0.5).expect("building");
            land.minus(&lakes).expect("building");
            let height = land.to_float("height", 0.0, 1.0).expect("building");
            height.smooth(4.0, Some(&hills)).expect("building");

            pipeline.start().expect("first start");
            pipeline.join().expect("no failures");
            black_box(height.wait().expect("completed"));
        });
    });
}

criterion_group!(benches, benchmark_overhead, benchmark_branching_graph);
criterion_main!(benches);
