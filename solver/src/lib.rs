//! Bounded, derivative-free global minimisation.
//!
//! The simulation crate hands a scalar loss function and a box of bounds
//! to a [`GlobalOptimizer`] and gets back the best vector found. Nothing
//! here knows about price paths; the objective is opaque and may be noisy.

pub mod de;
pub mod error;

pub use de::DifferentialEvolution;
pub use error::{SolverError, SolverResult};

use serde::{Deserialize, Serialize};

/// A loss function over a candidate vector. Lower is better.
///
/// Must be `Sync`: implementations are free to evaluate candidates
/// from several threads at once.
pub type Objective<'a> = dyn Fn(&[f64]) -> f64 + Sync + 'a;

/// The outcome of one minimisation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Best candidate found.
    pub x: Vec<f64>,
    /// Loss at `x`.
    pub fun: f64,
    /// Generations (iterations) actually run.
    pub generations: usize,
    /// Total objective evaluations.
    pub evaluations: usize,
    /// True when the convergence tolerance was met before the budget ran out.
    /// A `false` result is still the best candidate seen.
    pub converged: bool,
}

/// The narrow interface every optimizer exposes: bounds and an objective
/// in, the loss-minimising vector out.
pub trait GlobalOptimizer: Send + Sync {
    fn minimize(
        &self,
        objective: &Objective<'_>,
        bounds: &[(f64, f64)],
    ) -> SolverResult<OptimizationResult>;
}

impl<T: GlobalOptimizer + ?Sized> GlobalOptimizer for &T {
    fn minimize(
        &self,
        objective: &Objective<'_>,
        bounds: &[(f64, f64)],
    ) -> SolverResult<OptimizationResult> {
        (**self).minimize(objective, bounds)
    }
}

/// Reject empty, non-finite or inverted bounds.
pub fn validate_bounds(bounds: &[(f64, f64)]) -> SolverResult<()> {
    if bounds.is_empty() {
        return Err(SolverError::EmptyBounds);
    }
    for (dimension, &(lower, upper)) in bounds.iter().enumerate() {
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(SolverError::InvalidBounds { dimension, lower, upper });
        }
    }
    Ok(())
}
