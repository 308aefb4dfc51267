//! Shock envelope composer.
//!
//! Each crisis becomes a multiplicative curve starting on its day:
//!
//! ```text
//!   1.0 ──╮
//!         │ logistic decline over decline_days
//!         ╰──╮ 1 − drop
//!            │ logistic recovery over recovery_days
//!            ╰──────── recovery_target ~ U(1 − rec_var, 1 + rec_var)
//! ```
//!
//! and 1.0 everywhere outside that local window. Curves compound by
//! multiplication: a second shock inside an unrecovered first one deepens
//! the trough. The logistic ramps are rescaled to hit exactly 0 and 1 at
//! their end points, so the factor on an event's onset day is exactly 1.0
//! and the decline meets the recovery at exactly 1 − drop.

use crate::{
    config::{DampingConfig, EnvelopeConfig},
    rng::PathRng,
    scheduler::{CrisisEvent, Severity},
};

/// The sampled shape of one crisis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dislocation {
    pub drop: f64,
    pub decline_days: usize,
    pub recovery_days: usize,
    pub recovery_target: f64,
}

impl Dislocation {
    /// Draw order: drop, decline days, recovery days, recovery target.
    pub fn sample(
        severity: Severity,
        config: &EnvelopeConfig,
        recovery_variability: f64,
        rng: &mut PathRng,
    ) -> Self {
        let profile = config.profile(severity);
        let drop = rng.uniform(profile.drop.0, profile.drop.1);
        let decline_days = rng.int_range(profile.decline_days.0, profile.decline_days.1);
        let recovery_days = rng.int_range(profile.recovery_days.0, profile.recovery_days.1);
        let recovery_target = rng.uniform(1.0 - recovery_variability, 1.0 + recovery_variability);
        Self { drop, decline_days, recovery_days, recovery_target }
    }

    pub fn with_drop(self, drop: f64) -> Self {
        Self { drop, ..self }
    }

    /// Factor series of length `len`, starting on the event's day.
    pub fn curve(&self, len: usize, shape_k: f64) -> Vec<f64> {
        let mut curve = vec![1.0; len];
        if self.decline_days == 0 || self.recovery_days == 0 {
            return curve;
        }
        let trough = 1.0 - self.drop;
        let local = (0..self.decline_days)
            .map(|i| 1.0 - self.drop * logistic_ramp(i, self.decline_days, shape_k))
            .chain((0..self.recovery_days).map(|i| {
                trough + (self.recovery_target - trough) * logistic_ramp(i, self.recovery_days, shape_k)
            }));
        for (slot, value) in curve.iter_mut().zip(local) {
            *slot = value;
        }
        curve
    }
}

/// Logistic S-curve over `steps` points, rescaled so step 0 maps to
/// exactly 0.0 and step `steps - 1` to exactly 1.0.
pub fn logistic_ramp(step: usize, steps: usize, shape_k: f64) -> f64 {
    if steps <= 1 {
        return 1.0;
    }
    let raw = |u: f64| 1.0 / (1.0 + (-shape_k * (u - 0.5)).exp());
    let lo = raw(0.0);
    let hi = raw(1.0);
    let u = step as f64 / (steps - 1) as f64;
    ((raw(u) - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Scale a new shock's drop by how deep the path already is.
///
/// Below `threshold` the drop is untouched; at or beyond `cap` it is
/// zeroed; in between it is multiplied by
/// `0.5 · (1 − tanh(alpha · (drawdown − threshold)))`.
pub fn damp_drop(drop: f64, drawdown: f64, damping: &DampingConfig) -> f64 {
    if drawdown < damping.threshold {
        drop
    } else if drawdown >= damping.cap {
        0.0
    } else {
        drop * 0.5 * (1.0 - (damping.alpha * (drawdown - damping.threshold)).tanh())
    }
}

/// Builds the cumulative shock-factor series for one path.
pub struct ShockComposer<'a> {
    config: &'a EnvelopeConfig,
    recovery_variability: f64,
}

impl<'a> ShockComposer<'a> {
    pub fn new(config: &'a EnvelopeConfig, recovery_variability: f64) -> Self {
        Self { config, recovery_variability }
    }

    /// `events` must be sorted by day and every day must index `base_prices`.
    /// Returns a factor series the same length as `base_prices`; multiply it
    /// elementwise into the base path to get the shocked path.
    ///
    /// With damping configured, the drawdown seen by each new shock is the
    /// shocked price on its day against the running peak of the shocked
    /// path up to and including that day.
    pub fn compose(&self, events: &[CrisisEvent], base_prices: &[f64], rng: &mut PathRng) -> Vec<f64> {
        let len = base_prices.len();
        let mut cumulative = vec![1.0; len];
        let mut peak = f64::MIN;
        let mut scanned = 0;

        for event in events {
            let day = event.day;
            if day >= len {
                continue;
            }
            let mut dislocation =
                Dislocation::sample(event.severity, self.config, self.recovery_variability, rng);

            if let Some(damping) = &self.config.damping {
                while scanned <= day {
                    peak = peak.max(base_prices[scanned] * cumulative[scanned]);
                    scanned += 1;
                }
                let price = base_prices[day] * cumulative[day];
                let drawdown = if peak > 0.0 { 1.0 - price / peak } else { 0.0 };
                dislocation = dislocation.with_drop(damp_drop(dislocation.drop, drawdown, damping));
            }

            let curve = dislocation.curve(len - day, self.config.shape_k);
            for (factor, shock) in cumulative[day..].iter_mut().zip(curve) {
                *factor *= shock;
            }
        }
        cumulative
    }
}
