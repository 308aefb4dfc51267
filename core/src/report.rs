//! Single-run dashboard for one parameter set: averaged path statistics
//! and a P5 / mean / P95 price envelope at 5-year checkpoints.

use crate::{
    config::EngineConfig,
    error::SimResult,
    params::ProcessParameters,
    pipeline::PathSimulator,
    rng::{mix, RngBank},
    stats::{mean, percentile, PathStatistics},
    types::TRADING_DAYS_PER_YEAR,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const DEFAULT_REPORT_PATHS: usize = 100;

/// Stream family for report runs, kept apart from every scenario family.
const REPORT_FAMILY: u64 = 0x5245_504f_5254;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeRow {
    pub year: usize,
    pub p05: f64,
    pub mean: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub n_paths: usize,
    /// Field-wise mean over all paths; lost-period counts are averaged as floats.
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub max_drawdown: f64,
    pub max_daily_drop: f64,
    pub lost_years: f64,
    pub lost_five_year_periods: f64,
    pub lost_decades: f64,
    pub min_return: f64,
    pub max_return: f64,
    pub envelope: Vec<EnvelopeRow>,
}

/// Years 10, 15, 20, … up to the horizon.
pub fn checkpoint_years(horizon_years: usize) -> Vec<usize> {
    (10..=horizon_years).step_by(5).collect()
}

pub fn run_report(config: &EngineConfig, params: ProcessParameters, n_paths: usize) -> SimResult<SimulationReport> {
    config.validate()?;
    let bank = RngBank::new(config.master_seed);
    let simulator = PathSimulator::new(config, params, bank)?;
    let family = mix(REPORT_FAMILY);

    log::info!("running {n_paths} paths over {} years", config.horizon_years);
    let started = Instant::now();
    let paths: Vec<(PathStatistics, Vec<f64>)> = (0..n_paths as u64)
        .into_par_iter()
        .map(|i| {
            let path = simulator.simulate(bank.path_key(family, i));
            (PathStatistics::from_path(&path.prices), path.prices)
        })
        .collect();
    log::info!("simulation completed in {:.1}s", started.elapsed().as_secs_f64());

    let field = |f: &dyn Fn(&PathStatistics) -> f64| -> f64 {
        mean(&paths.iter().map(|(s, _)| f(s)).collect::<Vec<_>>())
    };
    let returns: Vec<f64> = paths.iter().map(|(s, _)| s.annualized_return).collect();

    let envelope = checkpoint_years(config.horizon_years)
        .into_iter()
        .map(|year| {
            let day = year * TRADING_DAYS_PER_YEAR;
            let prices: Vec<f64> = paths.iter().filter_map(|(_, p)| p.get(day).copied()).collect();
            EnvelopeRow {
                year,
                p05: percentile(&prices, 5.0),
                mean: mean(&prices),
                p95: percentile(&prices, 95.0),
            }
        })
        .collect();

    Ok(SimulationReport {
        n_paths,
        annualized_return: field(&|s| s.annualized_return),
        annualized_volatility: field(&|s| s.annualized_volatility),
        max_drawdown: field(&|s| s.max_drawdown),
        max_daily_drop: field(&|s| s.max_daily_drop),
        lost_years: field(&|s| s.lost_year_count as f64),
        lost_five_year_periods: field(&|s| s.lost_five_year_count as f64),
        lost_decades: field(&|s| s.lost_decade_count as f64),
        min_return: returns.iter().copied().fold(f64::INFINITY, f64::min),
        max_return: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        envelope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CalibratedParameters;

    #[test]
    fn checkpoints_start_at_year_ten() {
        assert_eq!(checkpoint_years(40), vec![10, 15, 20, 25, 30, 35, 40]);
        assert_eq!(checkpoint_years(12), vec![10]);
        assert!(checkpoint_years(5).is_empty());
    }

    #[test]
    fn report_over_short_horizon() {
        let config = EngineConfig { horizon_years: 10, ..EngineConfig::default_test() };
        let params = config.process_parameters(CalibratedParameters::new(0.06, 0.18, 1.5));
        let report = run_report(&config, params, 12).unwrap();

        assert_eq!(report.n_paths, 12);
        assert_eq!(report.envelope.len(), 1);
        let row = &report.envelope[0];
        assert!(row.p05 <= row.p95, "P5 above P95: {row:?}");
        assert!(report.min_return <= report.annualized_return);
        assert!(report.annualized_return <= report.max_return);
        assert!((0.0..1.0).contains(&report.max_drawdown));
    }
}
