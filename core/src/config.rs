use crate::{
    error::{SimError, SimResult},
    params::{AuxiliaryParameters, CalibratedParameters, ProcessParameters},
    scheduler::Severity,
    types::{TradingDay, TRADING_DAYS_PER_YEAR},
};
use serde::{Deserialize, Serialize};

// ── Crisis clustering ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Days after an event during which that class's rate is multiplied by k.
    pub boost_period: usize,
    /// Days after a major event during which no new event can fire.
    pub cooldown_period: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self { boost_period: 2000, cooldown_period: 756 }
    }
}

/// One event forced at a uniformly random day in [earliest_day, latest_day).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuaranteedEvent {
    pub earliest_day: TradingDay,
    pub latest_day: TradingDay,
    pub severity: Severity,
}

impl Default for GuaranteedEvent {
    fn default() -> Self {
        Self {
            earliest_day: TRADING_DAYS_PER_YEAR,
            latest_day: 5 * TRADING_DAYS_PER_YEAR,
            severity: Severity::Minor,
        }
    }
}

// ── Shock envelopes ────────────────────────────────────────────────

/// Uniform sampling ranges for one severity class. All ranges are half-open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShockProfile {
    pub drop: (f64, f64),
    pub decline_days: (usize, usize),
    pub recovery_days: (usize, usize),
}

impl ShockProfile {
    pub fn minor() -> Self {
        Self { drop: (0.20, 0.35), decline_days: (20, 70), recovery_days: (300, 1000) }
    }

    pub fn major() -> Self {
        Self { drop: (0.40, 0.60), decline_days: (40, 120), recovery_days: (1000, 2500) }
    }
}

/// Drawdown-aware damping of new shocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DampingConfig {
    /// Drawdown at which damping starts.
    pub threshold: f64,
    /// Drawdown at or beyond which new shocks are zeroed.
    pub cap: f64,
    /// Steepness of the tanh taper between threshold and cap.
    pub alpha: f64,
}

impl Default for DampingConfig {
    fn default() -> Self {
        Self { threshold: 0.5, cap: 0.65, alpha: 70.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    pub minor: ShockProfile,
    pub major: ShockProfile,
    /// Logistic steepness of both decline and recovery curves.
    pub shape_k: f64,
    /// `None` composes shocks without damping.
    pub damping: Option<DampingConfig>,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            minor: ShockProfile::minor(),
            major: ShockProfile::major(),
            shape_k: 10.0,
            damping: Some(DampingConfig::default()),
        }
    }
}

impl EnvelopeConfig {
    pub fn profile(&self, severity: Severity) -> &ShockProfile {
        match severity {
            Severity::Minor => &self.minor,
            Severity::Major => &self.major,
        }
    }
}

// ── Library acceptance ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceFilter {
    pub max_drawdown: f64,
    pub max_lost_decades: usize,
}

impl Default for AcceptanceFilter {
    fn default() -> Self {
        Self { max_drawdown: 0.75, max_lost_decades: 2 }
    }
}

// ── Calibration ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterBounds {
    pub mu: (f64, f64),
    pub sigma: (f64, f64),
    pub kappa: (f64, f64),
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self { mu: (0.03, 0.10), sigma: (0.12, 0.25), kappa: (0.5, 4.0) }
    }
}

impl ParameterBounds {
    /// Optimizer layout: [mu, sigma, kappa].
    pub fn as_vec(&self) -> Vec<(f64, f64)> {
        vec![self.mu, self.sigma, self.kappa]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Paths simulated per objective evaluation.
    pub batch_size: usize,
    /// Normaliser for the mean-return error term.
    pub mean_error_scale: f64,
    /// Normaliser for the spread error term.
    pub spread_error_scale: f64,
    pub bounds: ParameterBounds,
    pub max_generations: usize,
    pub population_multiplier: usize,
    pub tolerance: f64,
    pub solver_seed: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            mean_error_scale: 0.01,
            spread_error_scale: 0.1,
            bounds: ParameterBounds::default(),
            max_generations: 15,
            population_multiplier: 10,
            tolerance: 0.01,
            solver_seed: 0,
        }
    }
}

// ── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub horizon_years: usize,
    pub start_price: f64,
    pub auxiliary: AuxiliaryParameters,
    pub clustering: ClusterConfig,
    /// `None` disables the early-crisis injection.
    pub guaranteed_event: Option<GuaranteedEvent>,
    pub envelope: EnvelopeConfig,
    pub acceptance: AcceptanceFilter,
    pub calibration: CalibrationConfig,
    pub master_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon_years: 40,
            start_price: 1.0,
            auxiliary: AuxiliaryParameters::default(),
            clustering: ClusterConfig::default(),
            guaranteed_event: Some(GuaranteedEvent::default()),
            envelope: EnvelopeConfig::default(),
            acceptance: AcceptanceFilter::default(),
            calibration: CalibrationConfig::default(),
            master_seed: 42,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file and validate it.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&content).map_err(|e| anyhow::anyhow!("Cannot load {path}: {e}"))
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Short horizon and small batches for unit tests.
    pub fn default_test() -> Self {
        Self {
            horizon_years: 5,
            calibration: CalibrationConfig {
                batch_size: 8,
                max_generations: 2,
                population_multiplier: 2,
                ..CalibrationConfig::default()
            },
            master_seed: 7,
            ..Self::default()
        }
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_years * TRADING_DAYS_PER_YEAR
    }

    /// Full parameter set for a calibrated (mu, sigma, kappa).
    pub fn process_parameters(&self, calibrated: CalibratedParameters) -> ProcessParameters {
        ProcessParameters::from_parts(calibrated, &self.auxiliary)
    }

    /// Check every setting the simulation loop divides by, indexes with,
    /// or samples from. Called before any path is generated.
    pub fn validate(&self) -> SimResult<()> {
        if self.horizon_years == 0 {
            return Err(SimError::config("horizon_years", "must be at least 1"));
        }
        if !(self.start_price.is_finite() && self.start_price > 0.0) {
            return Err(SimError::config(
                "start_price",
                format!("must be positive, got {}", self.start_price),
            ));
        }

        let b = &self.calibration.bounds;
        for (field, (lo, hi)) in [("bounds.mu", b.mu), ("bounds.sigma", b.sigma), ("bounds.kappa", b.kappa)] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(SimError::config(field, format!("invalid range [{lo}, {hi}]")));
            }
        }
        // Both corners of the box must produce valid parameters.
        self.process_parameters(CalibratedParameters::new(b.mu.0, b.sigma.0, b.kappa.0))
            .validate()?;
        self.process_parameters(CalibratedParameters::new(b.mu.1, b.sigma.1, b.kappa.1))
            .validate()?;

        if self.clustering.boost_period == 0 {
            return Err(SimError::config("clustering.boost_period", "must be > 0 days"));
        }
        if self.clustering.cooldown_period == 0 {
            return Err(SimError::config("clustering.cooldown_period", "must be > 0 days"));
        }

        if let Some(g) = &self.guaranteed_event {
            if g.earliest_day >= g.latest_day {
                return Err(SimError::config(
                    "guaranteed_event",
                    format!("empty day range [{}, {})", g.earliest_day, g.latest_day),
                ));
            }
        }

        validate_profile("envelope.minor", &self.envelope.minor)?;
        validate_profile("envelope.major", &self.envelope.major)?;
        if !(self.envelope.shape_k.is_finite() && self.envelope.shape_k > 0.0) {
            return Err(SimError::config(
                "envelope.shape_k",
                format!("must be positive, got {}", self.envelope.shape_k),
            ));
        }
        if let Some(d) = &self.envelope.damping {
            if !(0.0 <= d.threshold && d.threshold < d.cap && d.cap <= 1.0) {
                return Err(SimError::config(
                    "envelope.damping",
                    format!("need 0 <= threshold < cap <= 1, got {} / {}", d.threshold, d.cap),
                ));
            }
            if !(d.alpha.is_finite() && d.alpha >= 0.0) {
                return Err(SimError::config("envelope.damping.alpha", "must be >= 0"));
            }
        }

        if !(0.0..=1.0).contains(&self.acceptance.max_drawdown) {
            return Err(SimError::config(
                "acceptance.max_drawdown",
                format!("must lie in [0, 1], got {}", self.acceptance.max_drawdown),
            ));
        }

        let c = &self.calibration;
        if c.batch_size < 2 {
            return Err(SimError::config("calibration.batch_size", "need at least 2 paths"));
        }
        for (field, scale) in [
            ("calibration.mean_error_scale", c.mean_error_scale),
            ("calibration.spread_error_scale", c.spread_error_scale),
        ] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(SimError::config(field, format!("must be positive, got {scale}")));
            }
        }
        if c.population_multiplier == 0 {
            return Err(SimError::config("calibration.population_multiplier", "must be > 0"));
        }
        Ok(())
    }
}

fn validate_profile(field: &'static str, p: &ShockProfile) -> SimResult<()> {
    let (lo, hi) = p.drop;
    if !(0.0 <= lo && lo < hi && hi < 1.0) {
        return Err(SimError::config(field, format!("drop range must satisfy 0 <= lo < hi < 1, got [{lo}, {hi})")));
    }
    for (what, (lo, hi)) in [("decline_days", p.decline_days), ("recovery_days", p.recovery_days)] {
        if lo == 0 || lo >= hi {
            return Err(SimError::config(field, format!("{what} range must be non-empty and start at 1 or more, got [{lo}, {hi})")));
        }
    }
    Ok(())
}
