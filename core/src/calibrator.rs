//! Scenario calibrator.
//!
//! For each target (mean annual return, spread) find (mu, sigma, kappa)
//! such that a batch of simulated paths reproduces the target:
//!
//! ```text
//! loss = ((mean_return − target_mean) / 0.01)²
//!      + ((spread − target_spread) / 0.1)²
//! spread = (P95(final) − P5(final)) / mean(final)
//! ```
//!
//! The loss is a Monte Carlo estimate, so it is noisy and not smooth. It is
//! handed to a population-based [`GlobalOptimizer`]; the batch itself is
//! simulated in parallel. Each candidate's paths are keyed by the scenario
//! and by the candidate vector, so the loss of a given candidate is the
//! same whichever thread evaluates it and in whatever order.
//!
//! RULES:
//!   - A scenario already present in the table is never recomputed.
//!   - Each result is appended (and flushed) as soon as its scenario finishes.
//!   - Budget exhaustion is not an error: the best candidate is stored.

use crate::{
    config::EngineConfig,
    error::SimResult,
    params::CalibratedParameters,
    pipeline::PathSimulator,
    rng::{mix, RngBank},
    stats::{annualized_return, mean, spread},
    store::ParameterTable,
    types::ScenarioTarget,
};
use chrono::{DateTime, Utc};
use longpath_solver::{DifferentialEvolution, GlobalOptimizer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One persisted calibration result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterLibraryEntry {
    pub target: ScenarioTarget,
    pub params: CalibratedParameters,
    /// Objective value at `params`.
    pub loss: f64,
    /// Whether the optimizer met its tolerance within budget.
    pub converged: bool,
    pub calibrated_at: DateTime<Utc>,
}

/// What a batch of paths achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub mean_return: f64,
    pub spread: f64,
}

/// Simulate `batch_size` paths of stream family `family` in parallel.
pub fn evaluate_batch(
    simulator: &PathSimulator<'_>,
    bank: &RngBank,
    family: u64,
    batch_size: usize,
) -> BatchOutcome {
    let results: Vec<(f64, f64)> = (0..batch_size as u64)
        .into_par_iter()
        .map(|i| {
            let path = simulator.simulate(bank.path_key(family, i));
            (annualized_return(&path.prices), path.final_price())
        })
        .collect();
    let (returns, finals): (Vec<f64>, Vec<f64>) = results.into_iter().unzip();
    BatchOutcome {
        mean_return: mean(&returns),
        spread: spread(&finals),
    }
}

/// Stream family for one candidate of one scenario.
fn candidate_family(scenario_key: u64, candidate: &CalibratedParameters) -> u64 {
    scenario_key
        ^ mix(candidate.mu.to_bits())
        ^ mix(candidate.sigma.to_bits()).rotate_left(21)
        ^ mix(candidate.kappa.to_bits()).rotate_left(42)
}

/// The stochastic loss for one scenario target.
pub struct ScenarioObjective<'a> {
    config: &'a EngineConfig,
    target: ScenarioTarget,
    bank: RngBank,
}

impl<'a> ScenarioObjective<'a> {
    pub fn new(config: &'a EngineConfig, target: ScenarioTarget) -> Self {
        Self {
            config,
            target,
            bank: RngBank::new(config.master_seed),
        }
    }

    /// Loss of candidate `x = [mu, sigma, kappa]`. Candidates that fail
    /// parameter validation score +inf rather than aborting the search.
    pub fn loss(&self, x: &[f64]) -> f64 {
        let Some(candidate) = CalibratedParameters::from_vector(x) else {
            log::warn!("rejecting candidate with {} coordinates, expected 3", x.len());
            return f64::INFINITY;
        };
        let params = self.config.process_parameters(candidate);
        let simulator = match PathSimulator::new(self.config, params, self.bank) {
            Ok(simulator) => simulator,
            Err(e) => {
                log::warn!("rejecting candidate {candidate:?}: {e}");
                return f64::INFINITY;
            }
        };
        let family = candidate_family(self.target.stream_key(), &candidate);
        let outcome = evaluate_batch(&simulator, &self.bank, family, self.config.calibration.batch_size);
        self.score(&outcome)
    }

    pub fn score(&self, outcome: &BatchOutcome) -> f64 {
        let c = &self.config.calibration;
        let mean_error = ((outcome.mean_return - self.target.mean) / c.mean_error_scale).powi(2);
        let spread_error = ((outcome.spread - self.target.spread) / c.spread_error_scale).powi(2);
        mean_error + spread_error
    }
}

pub struct Calibrator<O: GlobalOptimizer = DifferentialEvolution> {
    config: EngineConfig,
    optimizer: O,
}

impl Calibrator<DifferentialEvolution> {
    /// Differential evolution sized from the calibration config.
    pub fn new(config: EngineConfig) -> SimResult<Self> {
        let c = &config.calibration;
        let optimizer = DifferentialEvolution::new(c.population_multiplier, c.max_generations, c.tolerance)
            .with_seed(c.solver_seed);
        Self::with_optimizer(config, optimizer)
    }
}

impl<O: GlobalOptimizer> Calibrator<O> {
    pub fn with_optimizer(config: EngineConfig, optimizer: O) -> SimResult<Self> {
        config.validate()?;
        Ok(Self { config, optimizer })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the optimizer for one target. Always yields a result.
    pub fn calibrate_scenario(&self, target: ScenarioTarget) -> SimResult<ParameterLibraryEntry> {
        let objective = ScenarioObjective::new(&self.config, target);
        let bounds = self.config.calibration.bounds.as_vec();
        let result = self.optimizer.minimize(&|x: &[f64]| objective.loss(x), &bounds)?;
        let params = CalibratedParameters::from_vector(&result.x).ok_or_else(|| {
            anyhow::anyhow!("optimizer returned {} coordinates, expected 3", result.x.len())
        })?;

        if !result.converged {
            log::info!(
                "target ({:.4}, {:.3}): budget exhausted after {} generations, keeping best loss {:.4}",
                target.mean,
                target.spread,
                result.generations,
                result.fun
            );
        }

        Ok(ParameterLibraryEntry {
            target,
            params,
            loss: result.fun,
            converged: result.converged,
            calibrated_at: Utc::now(),
        })
    }

    /// Calibrate every target missing from `table`, appending each result
    /// as soon as it is found. Returns the table's full contents.
    ///
    /// Safe to call again after an interruption: completed scenarios are
    /// skipped, the interrupted one is redone from scratch.
    pub fn calibrate(
        &self,
        targets: &[ScenarioTarget],
        table: &mut dyn ParameterTable,
    ) -> SimResult<Vec<ParameterLibraryEntry>> {
        let mut pending = Vec::new();
        for target in targets {
            if !table.exists(target)? && !pending.iter().any(|p: &ScenarioTarget| p.matches(target)) {
                pending.push(*target);
            }
        }

        if pending.is_empty() {
            log::info!("all {} target scenarios already calibrated", targets.len());
            return table.entries();
        }
        log::info!("{} of {} scenarios to calibrate", pending.len(), targets.len());

        let started = Instant::now();
        for (n, target) in pending.iter().enumerate() {
            let scenario_started = Instant::now();
            log::info!(
                "scenario {}/{}: target mean={:.2}% spread={:.1}%",
                n + 1,
                pending.len(),
                target.mean * 100.0,
                target.spread * 100.0
            );

            let entry = self.calibrate_scenario(*target)?;
            table.append(&entry)?;

            log::info!(
                "scenario {}/{} done in {:.1}s: mu={:.3} sigma={:.3} kappa={:.2} loss={:.4}",
                n + 1,
                pending.len(),
                scenario_started.elapsed().as_secs_f64(),
                entry.params.mu,
                entry.params.sigma,
                entry.params.kappa,
                entry.loss
            );
        }
        log::info!(
            "calibrated {} scenarios in {:.2} minutes",
            pending.len(),
            started.elapsed().as_secs_f64() / 60.0
        );

        table.entries()
    }
}

/// Calibrate `targets` with the configured differential evolution.
pub fn calibrate(
    config: &EngineConfig,
    targets: &[ScenarioTarget],
    table: &mut dyn ParameterTable,
) -> SimResult<Vec<ParameterLibraryEntry>> {
    Calibrator::new(config.clone())?.calibrate(targets, table)
}
