//! Calibration loop: results land in the table, and a rerun over an
//! already-filled table does no optimisation work at all.

use longpath_core::{
    calibrator::ScenarioObjective,
    store::{LibraryStore, MemoryTables, ParameterTable},
    Calibrator, EngineConfig, ScenarioTarget, SimError,
};
use longpath_solver::{
    DifferentialEvolution, GlobalOptimizer, Objective, OptimizationResult, SolverResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts how many scenarios reach the optimizer.
struct CountingOptimizer {
    inner: DifferentialEvolution,
    calls: AtomicUsize,
}

impl CountingOptimizer {
    fn new(config: &EngineConfig) -> Self {
        let c = &config.calibration;
        Self {
            inner: DifferentialEvolution::new(c.population_multiplier, c.max_generations, c.tolerance),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GlobalOptimizer for CountingOptimizer {
    fn minimize(&self, objective: &Objective<'_>, bounds: &[(f64, f64)]) -> SolverResult<OptimizationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.minimize(objective, bounds)
    }
}

/// Reports a best vector missing its last coordinate.
struct TruncatingOptimizer;

impl GlobalOptimizer for TruncatingOptimizer {
    fn minimize(&self, _objective: &Objective<'_>, bounds: &[(f64, f64)]) -> SolverResult<OptimizationResult> {
        Ok(OptimizationResult {
            x: bounds.iter().take(bounds.len() - 1).map(|(lo, _)| *lo).collect(),
            fun: 0.0,
            generations: 0,
            evaluations: 0,
            converged: true,
        })
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn targets() -> Vec<ScenarioTarget> {
    vec![ScenarioTarget::new(0.05, 1.0), ScenarioTarget::new(0.07, 1.5)]
}

#[test]
fn calibrates_every_target_within_bounds() {
    init_logging();
    let config = EngineConfig::default_test();
    let mut table = MemoryTables::new();
    let entries = Calibrator::new(config.clone()).unwrap().calibrate(&targets(), &mut table).unwrap();

    assert_eq!(entries.len(), 2);
    let b = &config.calibration.bounds;
    for (entry, target) in entries.iter().zip(targets()) {
        assert!(entry.target.matches(&target), "rows out of completion order");
        assert!(entry.loss.is_finite(), "loss should be finite: {}", entry.loss);
        assert!((b.mu.0..=b.mu.1).contains(&entry.params.mu));
        assert!((b.sigma.0..=b.sigma.1).contains(&entry.params.sigma));
        assert!((b.kappa.0..=b.kappa.1).contains(&entry.params.kappa));
    }
}

#[test]
fn second_run_makes_no_optimizer_calls() {
    init_logging();
    let config = EngineConfig::default_test();
    let counting = CountingOptimizer::new(&config);
    let calibrator = Calibrator::with_optimizer(config, &counting).unwrap();
    let mut table = MemoryTables::new();

    let first = calibrator.calibrate(&targets(), &mut table).unwrap();
    assert_eq!(counting.calls(), 2);

    let second = calibrator.calibrate(&targets(), &mut table).unwrap();
    assert_eq!(counting.calls(), 2, "rerun invoked the optimizer");
    assert_eq!(first, second, "rerun changed the parameter table");
}

#[test]
fn near_equal_and_repeated_targets_are_calibrated_once() {
    init_logging();
    let config = EngineConfig::default_test();
    let counting = CountingOptimizer::new(&config);
    let calibrator = Calibrator::with_optimizer(config, &counting).unwrap();
    let mut table = MemoryTables::new();

    let noisy = vec![
        ScenarioTarget::new(0.06, 2.0),
        ScenarioTarget::new(0.06, 2.0),
        ScenarioTarget::new(0.06 + 1e-12, 2.0 - 1e-12),
    ];
    let entries = calibrator.calibrate(&noisy, &mut table).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(counting.calls(), 1);
}

#[test]
fn sqlite_table_survives_reopen() {
    init_logging();
    let path = std::env::temp_dir().join(format!("longpath-calibration-{}.db", std::process::id()));
    let path = path.to_string_lossy().into_owned();
    let _ = std::fs::remove_file(&path);

    let config = EngineConfig::default_test();
    {
        let mut store = LibraryStore::open(&path).unwrap();
        store.migrate().unwrap();
        Calibrator::new(config.clone())
            .unwrap()
            .calibrate(&targets()[..1], &mut store)
            .unwrap();
    }

    let counting = CountingOptimizer::new(&config);
    let calibrator = Calibrator::with_optimizer(config, &counting).unwrap();
    let mut store = LibraryStore::open(&path).unwrap();
    store.migrate().unwrap();
    assert!(store.exists(&targets()[0]).unwrap(), "row lost across reopen");

    let entries = calibrator.calibrate(&targets(), &mut store).unwrap();
    assert_eq!(counting.calls(), 1, "only the missing scenario should be calibrated");
    assert_eq!(entries.len(), 2);
    assert!(entries[0].target.matches(&targets()[0]));

    drop(store);
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{path}{suffix}"));
    }
}

#[test]
fn zero_recurrence_is_a_configuration_error() {
    init_logging();
    let mut config = EngineConfig::default_test();
    config.auxiliary.minor_event_years = 0.0;
    let err = Calibrator::new(config).err().expect("zero recurrence must be rejected");
    assert!(matches!(err, SimError::InvalidConfig { .. }), "unexpected error: {err}");
}

#[test]
fn empty_target_list_returns_existing_rows() {
    init_logging();
    let config = EngineConfig::default_test();
    let counting = CountingOptimizer::new(&config);
    let calibrator = Calibrator::with_optimizer(config, &counting).unwrap();
    let mut table = MemoryTables::new();
    assert!(calibrator.calibrate(&[], &mut table).unwrap().is_empty());
    assert_eq!(counting.calls(), 0);
}

#[test]
fn short_candidate_vector_scores_infinite_loss() {
    init_logging();
    let config = EngineConfig::default_test();
    let objective = ScenarioObjective::new(&config, targets()[0]);
    assert_eq!(objective.loss(&[0.05, 0.15]), f64::INFINITY);
    assert!(objective.loss(&[0.05, 0.15, 1.5]).is_finite());
}

#[test]
fn truncated_optimizer_result_is_an_error_not_a_row() {
    init_logging();
    let calibrator = Calibrator::with_optimizer(EngineConfig::default_test(), TruncatingOptimizer).unwrap();
    let mut table = MemoryTables::new();
    let err = calibrator.calibrate(&targets(), &mut table).unwrap_err();
    assert!(matches!(err, SimError::Other(_)), "unexpected error: {err}");
    assert!(table.entries().unwrap().is_empty(), "a malformed result was stored");
}
