//! Scheduling scenarios: ordering, failure, determinism, reset, replay.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tessera_core::{
    BooleanGrid, FloatGrid, GridError, GridSeed, Symmetry, SymmetrySettings, SymmetryType,
};
use tessera_pipeline::{
    downcast_ref, EntryStatus, GraphDescription, NodeError, Pipeline, PipelineConfig,
    PipelineError,
};

fn settings() -> SymmetrySettings {
    SymmetrySettings::uniform(Symmetry::Point(2)).unwrap()
}

fn mask(name: &str, seed: u64) -> BooleanGrid {
    BooleanGrid::new(64, GridSeed::new(seed).derive_named(name), settings(), name).unwrap()
}

fn pipeline(workers: usize) -> Pipeline {
    Pipeline::new(PipelineConfig::default().with_workers(workers))
}

#[test]
fn test_dependants_see_completed_producers() {
    let pipeline = pipeline(4);
    let land = pipeline.track(mask("land", 1)).unwrap();
    let reader = pipeline.track(mask("reader", 1)).unwrap();

    land.update("slow_fill", |grid| {
        thread::sleep(Duration::from_millis(50));
        grid.fill(true);
        Ok(())
    })
    .unwrap();
    reader
        .update_with("copy_land", &[land.id()], |grid, inputs| {
            let land = downcast_ref::<bool>(inputs[0].as_ref())?;
            for (i, &value) in land.cells().iter().enumerate() {
                grid.set(i % land.size(), i / land.size(), value);
            }
            Ok(())
        })
        .unwrap();

    pipeline.start().unwrap();
    let reader = reader.wait().unwrap();
    assert_eq!(reader.count(), 64 * 64);
    pipeline.join().unwrap();
}

#[test]
fn test_last_writer_wins() {
    let pipeline = pipeline(2);
    let land = pipeline.track(mask("land", 2)).unwrap();
    land.randomize(0.5, SymmetryType::Terrain).unwrap();
    land.invert().unwrap();
    let height = land.to_float("height", 0.0, 1.0).unwrap();
    land.invert().unwrap();

    let mut expected = mask("land", 2);
    expected.randomize(0.5, SymmetryType::Terrain).unwrap();
    expected.invert();

    pipeline.start().unwrap();
    let height = height.wait().unwrap();
    assert_eq!(BooleanGrid::from_threshold(&height, 0.5).cells(), expected.cells());

    expected.invert();
    assert_eq!(land.wait().unwrap().cells(), expected.cells());
}

#[test]
fn test_failure_aborts_promptly() {
    let pipeline = pipeline(4);
    let slow = pipeline.track(mask("slow", 3)).unwrap();
    let land = pipeline.track(mask("land", 3)).unwrap();

    slow.update("sleep", |_| {
        thread::sleep(Duration::from_secs(3));
        Ok(())
    })
    .unwrap();
    let failing = land
        .update("explode", |_| Err(GridError::InvalidSize(0)))
        .unwrap();
    let dependant = land.invert().unwrap();
    let derived = land.to_float("height", 0.0, 1.0).unwrap();

    let started = Instant::now();
    pipeline.start().unwrap();
    let err = pipeline.join().unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(2));

    match err {
        PipelineError::Aborted { failure } => {
            assert_eq!(failure.index, failing);
            assert_eq!(failure.method, "explode");
            assert_eq!(failure.declared, ["land"]);
            assert_eq!(failure.received, ["land"]);
            assert!(failure.location.file().ends_with("pipeline_scenarios.rs"));
            assert_eq!(failure.error, NodeError::Grid(GridError::InvalidSize(0)));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(pipeline.status(failing), Some(EntryStatus::Failed)));
    assert!(matches!(pipeline.status(dependant), Some(EntryStatus::Aborted)));
    assert!(matches!(derived.wait(), Err(PipelineError::Aborted { .. })));
}

#[test]
fn test_panicking_task_is_contained() {
    let pipeline = pipeline(2);
    let land = pipeline.track(mask("land", 4)).unwrap();
    land.update("panics", |_| panic!("kernel blew up")).unwrap();
    pipeline.start().unwrap();

    match pipeline.join() {
        Err(PipelineError::Aborted { failure }) => {
            assert_eq!(failure.error, NodeError::Panicked("kernel blew up".to_owned()));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

fn logged_run(seed: u64) -> Vec<String> {
    let pipeline = Pipeline::new(PipelineConfig::default().with_workers(4).with_determinism_log());
    let land = pipeline.track(mask("land", seed)).unwrap();
    let lakes = pipeline.track(mask("lakes", seed)).unwrap();

    land.randomize(0.55, SymmetryType::Terrain).unwrap();
    lakes.randomize(0.15, SymmetryType::Terrain).unwrap();
    land.erode(0.5, SymmetryType::Terrain, 2).unwrap();
    lakes.inflate(1.5).unwrap();
    land.minus(&lakes).unwrap();
    let height = land.to_float("height", -1.0, 1.0).unwrap();
    height.add_white_noise(0.1, SymmetryType::Terrain).unwrap();
    height.smooth(2.0, Some(&land)).unwrap();

    pipeline.start().unwrap();
    pipeline.join().unwrap();
    pipeline.determinism_lines()
}

#[test]
fn test_determinism_log_is_reproducible() {
    let first = logged_run(11);
    assert_eq!(first.len(), 8);
    assert_eq!(first, logged_run(11));
    assert_ne!(first, logged_run(12));

    for line in &first {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].len(), 16);
        assert!(fields[0].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

#[test]
fn test_hash_log_written_on_join() {
    let path = std::env::temp_dir().join(format!("tessera-hashes-{}.tsv", std::process::id()));
    let config = PipelineConfig {
        worker_threads: Some(2),
        hash_log_path: Some(path.clone()),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config);
    let land = pipeline.track(mask("land", 5)).unwrap();
    land.randomize(0.5, SymmetryType::Terrain).unwrap();
    land.smooth(2.0, 0.5).unwrap();
    pipeline.start().unwrap();
    pipeline.join().unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(written.lines().collect::<Vec<_>>(), pipeline.determinism_lines());
}

#[test]
fn test_reset_promotes_results() {
    let pipeline = pipeline(2);
    let land = pipeline.track(mask("land", 6)).unwrap();
    land.randomize(0.3, SymmetryType::Terrain).unwrap();
    pipeline.start().unwrap();
    assert!(matches!(land.invert(), Err(PipelineError::AlreadyStarted)));
    pipeline.join().unwrap();
    let first = land.wait().unwrap();

    pipeline.reset().unwrap();
    assert!(matches!(land.wait(), Err(PipelineError::NotStarted)));
    land.invert().unwrap();
    pipeline.start().unwrap();
    let second = land.wait().unwrap();
    pipeline.join().unwrap();

    assert_eq!(first.count() + second.count(), 64 * 64);
}

#[test]
fn test_description_replays_direct_calls() {
    let graph = GraphDescription::from_toml_str(
        r#"
seed = 99

[[grids]]
name = "land"
kind = "boolean"
size = 64
symmetry = { terrain = "point2" }

[[steps]]
grid = "land"
operation = "randomize"
params = [0.4]

[[steps]]
grid = "land"
operation = "erode"
params = [0.5, 1]

[[steps]]
grid = "land"
operation = "to_float"
params = [0.0, 2.0]
output = "height"
"#,
    )
    .unwrap();

    let pipeline = pipeline(3);
    let ids = graph.instantiate(&pipeline).unwrap();
    pipeline.start().unwrap();
    let height = pipeline.tracked::<f32>(ids["height"]).unwrap().wait().unwrap();

    let mut land =
        BooleanGrid::new(64, GridSeed::new(99).derive_named("land"), settings(), "land").unwrap();
    land.randomize(0.4, SymmetryType::Terrain).unwrap();
    land.erode(0.5, SymmetryType::Terrain, 1).unwrap();
    let expected = FloatGrid::from_boolean(&land, 0.0, 2.0);
    assert_eq!(height.cells(), expected.cells());
}

#[test]
fn test_independent_pipelines_run_concurrently() {
    let runs: Vec<_> = (0..3)
        .map(|_| thread::spawn(|| logged_run(21)))
        .collect();
    let logs: Vec<Vec<String>> = runs.into_iter().map(|run| run.join().unwrap()).collect();
    assert!(logs.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn test_snapshots_are_shared_not_copied() {
    let pipeline = pipeline(2);
    let land = pipeline.track(mask("land", 7)).unwrap();
    land.randomize(0.5, SymmetryType::Terrain).unwrap();
    pipeline.start().unwrap();
    let first = land.wait().unwrap();
    let second = land.wait().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}
