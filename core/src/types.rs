//! Shared primitive types and time conventions.

use serde::{Deserialize, Serialize};

/// A 0-based trading day. One simulation step = one trading day.
pub type TradingDay = usize;

/// Row identifier in the final statistics table.
pub type PathId = u64;

pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Fixed simulation step, in years.
pub const DT: f64 = 1.0 / TRADING_DAYS_PER_YEAR as f64;

/// Prices are clamped to this floor before any log transform.
pub const PRICE_FLOOR: f64 = 1e-9;

/// Relative and absolute tolerance used when matching scenario targets.
pub const TARGET_RTOL: f64 = 1e-5;
pub const TARGET_ATOL: f64 = 1e-8;

/// Convert a period in years to whole trading days (truncating).
pub fn years_to_days(years: f64) -> usize {
    (years * TRADING_DAYS_PER_YEAR as f64) as usize
}

/// `|a - b| <= atol + rtol * |b|`.
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= TARGET_ATOL + TARGET_RTOL * b.abs()
}

/// A grid point: desired mean annualized return and normalized
/// (P95 − P5) / mean spread of final prices across many paths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTarget {
    pub mean: f64,
    pub spread: f64,
}

impl ScenarioTarget {
    pub fn new(mean: f64, spread: f64) -> Self {
        Self { mean, spread }
    }

    /// Approximate equality on both coordinates.
    pub fn matches(&self, other: &ScenarioTarget) -> bool {
        approx_eq(self.mean, other.mean) && approx_eq(self.spread, other.spread)
    }

    /// Stable stream key for this scenario's random streams.
    /// Derived from the target values so a resumed run reproduces the
    /// same paths regardless of which scenarios were skipped.
    pub fn stream_key(&self) -> u64 {
        crate::rng::mix(self.mean.to_bits()) ^ crate::rng::mix(self.spread.to_bits()).rotate_left(17)
    }

    /// Means 4.0%..=9.0% in 0.5% steps × spreads 1.00..=3.00 in 0.25 steps.
    pub fn default_grid() -> Vec<ScenarioTarget> {
        let mut grid = Vec::with_capacity(11 * 9);
        for m in 0..=10 {
            for s in 0..=8 {
                grid.push(ScenarioTarget::new(0.04 + 0.005 * m as f64, 1.0 + 0.25 * s as f64));
            }
        }
        grid
    }
}
