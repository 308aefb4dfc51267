//! Stochastic path generator: mean-reverting log-price diffusion with a
//! tanh-bounded restoring force.
//!
//! ```text
//! X₀     = ln S₀
//! target = ln S₀ + mu · t,          t = (i + 1) · dt
//! Xᵢ₊₁   = Xᵢ − kappa · tanh(beta · (Xᵢ − target)) · dt + sigma · √dt · Z
//! ```
//!
//! tanh saturates at ±1, so the restoring force never exceeds kappa·dt
//! however far the path strays. For small beta·deviation it behaves like
//! a linear Ornstein-Uhlenbeck pull with strength kappa·beta.

use crate::{params::ProcessParameters, rng::PathRng, types::DT};

/// Log-price trajectory of length `horizon + 1`, starting at `ln(s0)`.
pub fn generate_log_path(
    horizon: usize,
    params: &ProcessParameters,
    s0: f64,
    rng: &mut PathRng,
) -> Vec<f64> {
    let log_s0 = s0.ln();
    let shock_scale = params.sigma * DT.sqrt();

    let mut path = Vec::with_capacity(horizon + 1);
    let mut x = log_s0;
    path.push(x);
    for i in 0..horizon {
        let t = (i + 1) as f64 * DT;
        let target = log_s0 + params.mu * t;
        let reversion = -params.kappa * (params.beta * (x - target)).tanh() * DT;
        x += reversion + shock_scale * rng.standard_normal();
        path.push(x);
    }
    path
}

/// Price trajectory of length `horizon + 1` with `prices[0] == s0` exactly.
pub fn generate_price_path(
    horizon: usize,
    params: &ProcessParameters,
    s0: f64,
    rng: &mut PathRng,
) -> Vec<f64> {
    let mut prices: Vec<f64> = generate_log_path(horizon, params, s0, rng)
        .into_iter()
        .map(f64::exp)
        .collect();
    // exp(ln(s0)) can be off by an ulp.
    prices[0] = s0;
    prices
}
