//! One full path: diffusion → crisis schedule → shock envelope → return cap.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Base price path from the tanh-reverting diffusion
//!   2. Crisis schedule, plus the optional guaranteed early event
//!   3. Shock factors composed over the base path
//!   4. Soft return cap on the shocked path
//!
//! Calibration, library generation and the single-run report all go
//! through this one pipeline; damping is whatever the envelope config says.

use crate::{
    capping::apply_return_capping,
    config::EngineConfig,
    envelope::ShockComposer,
    error::SimResult,
    generator::generate_price_path,
    params::ProcessParameters,
    rng::{RngBank, StreamSlot},
    scheduler::{inject_guaranteed_event, CrisisEvent, CrisisScheduler},
};

/// A finished path and the crises that shaped it.
#[derive(Debug, Clone)]
pub struct SimulatedPath {
    pub prices: Vec<f64>,
    pub events: Vec<CrisisEvent>,
}

impl SimulatedPath {
    pub fn final_price(&self) -> f64 {
        self.prices.last().copied().unwrap_or(f64::NAN)
    }
}

pub struct PathSimulator<'a> {
    config: &'a EngineConfig,
    params: ProcessParameters,
    scheduler: CrisisScheduler,
    bank: RngBank,
}

impl<'a> PathSimulator<'a> {
    /// Validates the parameters up front so nothing inside the loop can fault.
    pub fn new(config: &'a EngineConfig, params: ProcessParameters, bank: RngBank) -> SimResult<Self> {
        params.validate()?;
        let scheduler = CrisisScheduler::from_parameters(&params, &config.clustering)?;
        Ok(Self { config, params, scheduler, bank })
    }

    /// Simulate the path identified by `path_key` (see [`RngBank::path_key`]).
    pub fn simulate(&self, path_key: u64) -> SimulatedPath {
        let horizon = self.config.horizon_days();

        let mut diffusion_rng = self.bank.for_stage(path_key, StreamSlot::Diffusion);
        let base = generate_price_path(horizon, &self.params, self.config.start_price, &mut diffusion_rng);

        let mut schedule_rng = self.bank.for_stage(path_key, StreamSlot::CrisisSchedule);
        let mut events = self.scheduler.schedule(horizon, &mut schedule_rng);
        if let Some(guaranteed) = &self.config.guaranteed_event {
            inject_guaranteed_event(&mut events, guaranteed, horizon, &mut schedule_rng);
        }

        let mut envelope_rng = self.bank.for_stage(path_key, StreamSlot::Envelope);
        let composer = ShockComposer::new(&self.config.envelope, self.params.recovery_variability);
        let factors = composer.compose(&events, &base, &mut envelope_rng);

        let shocked: Vec<f64> = base.iter().zip(&factors).map(|(p, f)| p * f).collect();
        let prices = apply_return_capping(&shocked, self.params.return_cap_gamma);

        SimulatedPath { prices, events }
    }
}
