//! Differential Evolution (DE/best/1/bin).
//!
//! ```text
//! For each member xᵢ of the population:
//!   1. Pick two distinct members xₐ, xᵦ (both ≠ i)
//!   2. Mutant: v = x_best + F·(xₐ - xᵦ), F dithered per generation
//!   3. Crossover: uⱼ = vⱼ if rand() < CR (or j == j_rand) else xᵢⱼ
//!   4. Selection, deferred to the end of the generation:
//!      xᵢ' = u if f(u) <= f(xᵢ)
//! ```
//!
//! The search runs in the unit hypercube and is scaled to the caller's
//! bounds only when the objective is evaluated. Because selection is
//! deferred, every trial vector of a generation is known up front and the
//! whole batch is evaluated in parallel with rayon. Trial generation is
//! sequential on a seeded PCG stream, so results do not depend on thread
//! scheduling as long as the objective itself is deterministic.

use crate::{validate_bounds, GlobalOptimizer, Objective, OptimizationResult, SolverError, SolverResult};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Smallest population DE/best/1 can work with.
const MIN_POPULATION: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferentialEvolution {
    /// Population size is `population_multiplier * dimension`.
    pub population_multiplier: usize,
    /// Generation budget. The initial population does not count.
    pub max_generations: usize,
    /// Relative tolerance on the spread of population energies.
    pub tolerance: f64,
    /// Absolute tolerance on the spread of population energies.
    pub absolute_tolerance: f64,
    /// Mutation factor F is drawn uniformly from this range each generation.
    pub mutation: (f64, f64),
    /// Crossover probability CR.
    pub recombination: f64,
    pub seed: u64,
}

impl Default for DifferentialEvolution {
    fn default() -> Self {
        Self {
            population_multiplier: 15,
            max_generations: 1000,
            tolerance: 0.01,
            absolute_tolerance: 0.0,
            mutation: (0.5, 1.0),
            recombination: 0.7,
            seed: 0,
        }
    }
}

impl DifferentialEvolution {
    pub fn new(population_multiplier: usize, max_generations: usize, tolerance: f64) -> Self {
        Self {
            population_multiplier,
            max_generations,
            tolerance,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn check_settings(&self, dimension: usize) -> SolverResult<usize> {
        let size = self.population_multiplier * dimension;
        if size < MIN_POPULATION {
            return Err(SolverError::PopulationTooSmall { size, minimum: MIN_POPULATION });
        }
        let (f_lo, f_hi) = self.mutation;
        if !(0.0..=2.0).contains(&f_lo) || !(0.0..=2.0).contains(&f_hi) || f_lo > f_hi {
            return Err(SolverError::InvalidSetting { name: "mutation", value: f_lo });
        }
        if !(0.0..=1.0).contains(&self.recombination) {
            return Err(SolverError::InvalidSetting {
                name: "recombination",
                value: self.recombination,
            });
        }
        if !(self.tolerance >= 0.0) {
            return Err(SolverError::InvalidSetting { name: "tolerance", value: self.tolerance });
        }
        Ok(size)
    }
}

impl GlobalOptimizer for DifferentialEvolution {
    fn minimize(
        &self,
        objective: &Objective<'_>,
        bounds: &[(f64, f64)],
    ) -> SolverResult<OptimizationResult> {
        validate_bounds(bounds)?;
        let dimension = bounds.len();
        let size = self.check_settings(dimension)?;
        let mut rng = Pcg64Mcg::seed_from_u64(self.seed);

        let mut population = latin_hypercube(size, dimension, &mut rng);
        let mut energies = evaluate_all(objective, bounds, &population);
        let mut evaluations = size;
        let mut best = argmin(&energies);
        let mut generations = 0;
        let mut converged = has_converged(&energies, self.tolerance, self.absolute_tolerance);

        while !converged && generations < self.max_generations {
            generations += 1;
            let f = if self.mutation.0 < self.mutation.1 {
                rng.gen_range(self.mutation.0..self.mutation.1)
            } else {
                self.mutation.0
            };

            let trials: Vec<Vec<f64>> = (0..size)
                .map(|i| self.trial_vector(i, best, f, &population, &mut rng))
                .collect();
            let trial_energies = evaluate_all(objective, bounds, &trials);
            evaluations += size;

            for (i, (trial, energy)) in trials.into_iter().zip(trial_energies).enumerate() {
                if energy <= energies[i] {
                    population[i] = trial;
                    energies[i] = energy;
                }
            }
            best = argmin(&energies);
            converged = has_converged(&energies, self.tolerance, self.absolute_tolerance);

            log::debug!(
                "differential_evolution step {generations}: f(x)= {:.6}",
                energies[best]
            );
        }

        Ok(OptimizationResult {
            x: scale(&population[best], bounds),
            fun: energies[best],
            generations,
            evaluations,
            converged,
        })
    }
}

impl DifferentialEvolution {
    fn trial_vector(
        &self,
        target: usize,
        best: usize,
        f: f64,
        population: &[Vec<f64>],
        rng: &mut Pcg64Mcg,
    ) -> Vec<f64> {
        let (a, b) = pick_two(population.len(), target, rng);
        let dimension = population[target].len();
        let j_rand = rng.gen_range(0..dimension);

        (0..dimension)
            .map(|j| {
                let crossover: f64 = rng.gen();
                if j == j_rand || crossover < self.recombination {
                    let value = population[best][j] + f * (population[a][j] - population[b][j]);
                    if (0.0..=1.0).contains(&value) {
                        value
                    } else {
                        // Out-of-box mutants are redrawn uniformly.
                        rng.gen::<f64>()
                    }
                } else {
                    population[target][j]
                }
            })
            .collect()
    }
}

/// Stratified initial sample: one point per row stratum in every dimension.
fn latin_hypercube(size: usize, dimension: usize, rng: &mut Pcg64Mcg) -> Vec<Vec<f64>> {
    let segment = 1.0 / size as f64;
    let mut population = vec![vec![0.0; dimension]; size];
    for j in 0..dimension {
        let mut strata: Vec<usize> = (0..size).collect();
        strata.shuffle(rng);
        for (i, stratum) in strata.into_iter().enumerate() {
            population[i][j] = (stratum as f64 + rng.gen::<f64>()) * segment;
        }
    }
    population
}

fn pick_two(size: usize, exclude: usize, rng: &mut Pcg64Mcg) -> (usize, usize) {
    let mut picked = Vec::with_capacity(2);
    while picked.len() < 2 {
        let idx = rng.gen_range(0..size);
        if idx != exclude && !picked.contains(&idx) {
            picked.push(idx);
        }
    }
    (picked[0], picked[1])
}

fn scale(unit: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    unit.iter()
        .zip(bounds)
        .map(|(u, &(lower, upper))| lower + u * (upper - lower))
        .collect()
}

fn evaluate_all(objective: &Objective<'_>, bounds: &[(f64, f64)], members: &[Vec<f64>]) -> Vec<f64> {
    members
        .par_iter()
        .map(|unit| {
            let energy = objective(&scale(unit, bounds));
            if energy.is_nan() {
                f64::INFINITY
            } else {
                energy
            }
        })
        .collect()
}

fn argmin(energies: &[f64]) -> usize {
    energies
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map_or(0, |(i, _)| i)
}

/// Converged when std(energies) <= atol + tol * |mean(energies)|.
fn has_converged(energies: &[f64], tol: f64, atol: f64) -> bool {
    if energies.iter().any(|e| !e.is_finite()) {
        return false;
    }
    let n = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / n;
    let variance = energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() <= atol + tol * mean.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sphere(x: &[f64]) -> f64 {
        x.iter().map(|xi| (xi - 0.3) * (xi - 0.3)).sum()
    }

    #[test]
    fn finds_minimum_of_shifted_sphere() {
        let de = DifferentialEvolution::new(15, 200, 1e-6).with_seed(7);
        let bounds = vec![(-5.0, 5.0); 3];
        let result = de.minimize(&sphere, &bounds).unwrap();

        assert!(result.fun < 1e-3, "loss {} should be near zero", result.fun);
        for xi in &result.x {
            assert!((xi - 0.3).abs() < 0.05, "coordinate {xi} should be near 0.3");
        }
    }

    #[test]
    fn result_stays_inside_bounds() {
        // Minimum lies outside the box; best point must sit on the edge, not beyond it.
        let de = DifferentialEvolution::new(10, 50, 1e-9).with_seed(3);
        let bounds = vec![(1.0, 2.0), (-3.0, -2.0)];
        let result = de.minimize(&|x: &[f64]| x[0] * x[0] + x[1] * x[1], &bounds).unwrap();

        assert!((1.0..=2.0).contains(&result.x[0]));
        assert!((-3.0..=-2.0).contains(&result.x[1]));
        assert!(result.x[0] < 1.1, "x0 should approach the lower edge, got {}", result.x[0]);
    }

    #[test]
    fn same_seed_is_reproducible() {
        let bounds = vec![(0.0, 1.0); 2];
        let a = DifferentialEvolution::new(10, 20, 0.0).with_seed(99).minimize(&sphere, &bounds).unwrap();
        let b = DifferentialEvolution::new(10, 20, 0.0).with_seed(99).minimize(&sphere, &bounds).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn exhausted_budget_returns_best_candidate() {
        let de = DifferentialEvolution::new(10, 2, 0.0).with_seed(1);
        let calls = AtomicUsize::new(0);
        let objective = |x: &[f64]| {
            calls.fetch_add(1, Ordering::Relaxed);
            sphere(x)
        };
        let result = de.minimize(&objective, &[(0.0, 1.0), (0.0, 1.0)]).unwrap();

        assert!(!result.converged);
        assert_eq!(result.generations, 2);
        assert_eq!(result.evaluations, 20 * 3);
        assert_eq!(calls.load(Ordering::Relaxed), result.evaluations);
        assert!(result.fun.is_finite());
    }

    #[test]
    fn flat_objective_converges_immediately() {
        let de = DifferentialEvolution::new(10, 100, 0.01);
        let result = de.minimize(&|_: &[f64]| 1.0, &[(0.0, 1.0)]).unwrap();
        assert!(result.converged);
        assert_eq!(result.generations, 0);
    }

    #[test]
    fn rejects_bad_bounds_and_tiny_population() {
        let de = DifferentialEvolution::default();
        assert_eq!(de.minimize(&sphere, &[]).unwrap_err(), SolverError::EmptyBounds);
        assert!(matches!(
            de.minimize(&sphere, &[(1.0, 0.0)]),
            Err(SolverError::InvalidBounds { dimension: 0, .. })
        ));
        let tiny = DifferentialEvolution::new(2, 10, 0.01);
        assert!(matches!(
            tiny.minimize(&sphere, &[(0.0, 1.0)]),
            Err(SolverError::PopulationTooSmall { size: 2, .. })
        ));
    }
}
