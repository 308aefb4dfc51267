//! Process parameters for one path or scenario.

use crate::{
    error::{SimError, SimResult},
    types::TRADING_DAYS_PER_YEAR,
};
use serde::{Deserialize, Serialize};

/// The three parameters the calibrator searches over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedParameters {
    /// Drift of the reversion target, per year.
    pub mu: f64,
    /// Diffusion volatility, per sqrt(year).
    pub sigma: f64,
    /// Reversion strength.
    pub kappa: f64,
}

impl CalibratedParameters {
    pub fn new(mu: f64, sigma: f64, kappa: f64) -> Self {
        Self { mu, sigma, kappa }
    }

    /// Optimizer vector layout: [mu, sigma, kappa]. `None` unless `x`
    /// has exactly three coordinates.
    pub fn from_vector(x: &[f64]) -> Option<Self> {
        let [mu, sigma, kappa]: [f64; 3] = x.try_into().ok()?;
        Some(Self { mu, sigma, kappa })
    }
}

/// Parameters held fixed while calibrating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryParameters {
    /// Nonlinearity of the tanh reversion force.
    pub beta: f64,
    /// Mean recurrence of minor crises, in years. `inf` disables them.
    pub minor_event_years: f64,
    /// Mean recurrence of major crises, in years. `inf` disables them.
    pub major_event_years: f64,
    /// Rate multiplier inside a post-event boost window.
    pub cluster_boost_k: f64,
    /// Return-capping softness. `<= 0` disables capping.
    pub return_cap_gamma: f64,
    /// Half-width of the recovery-target distribution around 1.0.
    pub recovery_variability: f64,
}

impl Default for AuxiliaryParameters {
    fn default() -> Self {
        Self {
            beta: 4.724,
            minor_event_years: 14.338,
            major_event_years: 33.129,
            cluster_boost_k: 8.701,
            return_cap_gamma: 13.726,
            recovery_variability: 0.118,
        }
    }
}

/// Everything the path pipeline needs. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessParameters {
    pub mu: f64,
    pub sigma: f64,
    pub kappa: f64,
    pub beta: f64,
    pub minor_event_years: f64,
    pub major_event_years: f64,
    pub cluster_boost_k: f64,
    pub return_cap_gamma: f64,
    pub recovery_variability: f64,
}

impl ProcessParameters {
    pub fn from_parts(calibrated: CalibratedParameters, aux: &AuxiliaryParameters) -> Self {
        Self {
            mu: calibrated.mu,
            sigma: calibrated.sigma,
            kappa: calibrated.kappa,
            beta: aux.beta,
            minor_event_years: aux.minor_event_years,
            major_event_years: aux.major_event_years,
            cluster_boost_k: aux.cluster_boost_k,
            return_cap_gamma: aux.return_cap_gamma,
            recovery_variability: aux.recovery_variability,
        }
    }

    /// Base daily probability of a minor crisis.
    pub fn minor_daily_rate(&self) -> f64 {
        daily_rate(self.minor_event_years)
    }

    /// Base daily probability of a major crisis.
    pub fn major_daily_rate(&self) -> f64 {
        daily_rate(self.major_event_years)
    }

    /// Reject anything that would fault inside the simulation loop.
    pub fn validate(&self) -> SimResult<()> {
        finite("mu", self.mu)?;
        non_negative("sigma", self.sigma)?;
        non_negative("kappa", self.kappa)?;
        non_negative("beta", self.beta)?;
        recurrence("minor_event_years", self.minor_event_years)?;
        recurrence("major_event_years", self.major_event_years)?;
        if !(self.cluster_boost_k.is_finite() && self.cluster_boost_k > 0.0) {
            return Err(SimError::config(
                "cluster_boost_k",
                format!("must be a positive number, got {}", self.cluster_boost_k),
            ));
        }
        if self.return_cap_gamma.is_nan() || self.return_cap_gamma == f64::INFINITY {
            return Err(SimError::config(
                "return_cap_gamma",
                format!("must be finite, got {}", self.return_cap_gamma),
            ));
        }
        if !(0.0..1.0).contains(&self.recovery_variability) {
            return Err(SimError::config(
                "recovery_variability",
                format!("must lie in [0, 1), got {}", self.recovery_variability),
            ));
        }
        Ok(())
    }
}

fn daily_rate(recurrence_years: f64) -> f64 {
    1.0 / (recurrence_years * TRADING_DAYS_PER_YEAR as f64)
}

fn finite(field: &'static str, value: f64) -> SimResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimError::config(field, format!("must be finite, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f64) -> SimResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::config(field, format!("must be finite and >= 0, got {value}")))
    }
}

/// Recurrence must be strictly positive; +inf means "never".
fn recurrence(field: &'static str, years: f64) -> SimResult<()> {
    if years > 0.0 {
        Ok(())
    } else {
        Err(SimError::config(
            field,
            format!("mean recurrence must be > 0 years, got {years}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProcessParameters {
        ProcessParameters::from_parts(
            CalibratedParameters::new(0.06, 0.18, 1.5),
            &AuxiliaryParameters::default(),
        )
    }

    #[test]
    fn optimizer_vector_must_have_three_coordinates() {
        assert_eq!(
            CalibratedParameters::from_vector(&[0.06, 0.18, 1.5]),
            Some(CalibratedParameters::new(0.06, 0.18, 1.5))
        );
        assert_eq!(CalibratedParameters::from_vector(&[0.06, 0.18]), None);
        assert_eq!(CalibratedParameters::from_vector(&[]), None);
        assert_eq!(CalibratedParameters::from_vector(&[0.06, 0.18, 1.5, 2.0]), None);
    }

    #[test]
    fn default_parameters_are_valid() {
        sample().validate().unwrap();
    }

    #[test]
    fn zero_recurrence_is_a_config_error() {
        let mut p = sample();
        p.minor_event_years = 0.0;
        let err = p.validate().unwrap_err();
        assert!(
            matches!(err, SimError::InvalidConfig { field: "minor_event_years", .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn infinite_recurrence_means_no_events() {
        let mut p = sample();
        p.major_event_years = f64::INFINITY;
        p.validate().unwrap();
        assert_eq!(p.major_daily_rate(), 0.0);
    }

    #[test]
    fn nan_values_are_rejected() {
        let mut p = sample();
        p.sigma = f64::NAN;
        assert!(p.validate().is_err());
        let mut p = sample();
        p.major_event_years = f64::NAN;
        assert!(p.validate().is_err());
    }
}
