//! Library builder: calibrated parameters in, the final per-path
//! statistics table out.
//!
//! Per scenario: simulate ceil(total / scenarios) paths, drop any path
//! whose drawdown or lost-decade count is out of bounds (no replacement
//! draws), then stamp every surviving row with the scenario-wide P5/P95
//! of final prices and the scenario's realised spread.

use crate::{
    calibrator::ParameterLibraryEntry,
    config::{AcceptanceFilter, EngineConfig},
    error::SimResult,
    pipeline::PathSimulator,
    rng::RngBank,
    stats::{mean, percentile, PathStatistics},
    store::StatisticsTable,
    types::{PathId, ScenarioTarget},
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalStatisticsRow {
    pub path_id: PathId,
    pub target: ScenarioTarget,
    pub actual_annual_return: f64,
    /// Scenario-level (P95 − P5) / mean of accepted final prices.
    pub actual_spread: f64,
    pub scenario_p05_price: f64,
    pub scenario_p95_price: f64,
    pub max_drop: f64,
    pub lost_decades: usize,
}

impl AcceptanceFilter {
    pub fn accepts(&self, stats: &PathStatistics) -> bool {
        stats.max_drawdown <= self.max_drawdown && stats.lost_decade_count <= self.max_lost_decades
    }
}

/// How one scenario went.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioYield {
    pub target: ScenarioTarget,
    pub generated: usize,
    pub accepted: usize,
}

pub struct LibraryBuilder {
    config: EngineConfig,
    bank: RngBank,
}

impl LibraryBuilder {
    pub fn new(config: EngineConfig) -> SimResult<Self> {
        config.validate()?;
        let bank = RngBank::new(config.master_seed);
        Ok(Self { config, bank })
    }

    /// Paths generated per scenario: ceil(total / scenarios).
    pub fn paths_per_scenario(target_size: usize, scenarios: usize) -> usize {
        if scenarios == 0 {
            0
        } else {
            target_size.div_ceil(scenarios)
        }
    }

    /// Simulate and filter one scenario. Returns accepted rows numbered
    /// from `first_path_id`, plus the yield.
    pub fn build_scenario(
        &self,
        entry: &ParameterLibraryEntry,
        quota: usize,
        first_path_id: PathId,
    ) -> SimResult<(Vec<FinalStatisticsRow>, ScenarioYield)> {
        let params = self.config.process_parameters(entry.params);
        let simulator = PathSimulator::new(&self.config, params, self.bank)?;
        let family = entry.target.stream_key();
        let acceptance = &self.config.acceptance;

        let accepted: Vec<(PathStatistics, f64)> = (0..quota as u64)
            .into_par_iter()
            .map(|i| {
                let path = simulator.simulate(self.bank.path_key(family, i));
                (PathStatistics::from_path(&path.prices), path.final_price())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .filter(|(stats, _)| acceptance.accepts(stats))
            .collect();

        let yielded = ScenarioYield {
            target: entry.target,
            generated: quota,
            accepted: accepted.len(),
        };
        if accepted.is_empty() {
            return Ok((Vec::new(), yielded));
        }

        let finals: Vec<f64> = accepted.iter().map(|(_, f)| *f).collect();
        let p05 = percentile(&finals, 5.0);
        let p95 = percentile(&finals, 95.0);
        let actual_spread = (p95 - p05) / mean(&finals);

        let rows = accepted
            .iter()
            .enumerate()
            .map(|(i, (stats, _))| FinalStatisticsRow {
                path_id: first_path_id + i as PathId,
                target: entry.target,
                actual_annual_return: stats.annualized_return,
                actual_spread,
                scenario_p05_price: p05,
                scenario_p95_price: p95,
                max_drop: stats.max_drawdown,
                lost_decades: stats.lost_decade_count,
            })
            .collect();
        Ok((rows, yielded))
    }

    /// Build the statistics library into `table` and return its full
    /// contents. Scenarios already present in `table` are skipped, so a
    /// second call after an interruption only does the missing work.
    pub fn generate_library(
        &self,
        entries: &[ParameterLibraryEntry],
        target_size: usize,
        table: &mut dyn StatisticsTable,
    ) -> SimResult<Vec<FinalStatisticsRow>> {
        let quota = Self::paths_per_scenario(target_size, entries.len());
        if quota == 0 {
            return table.rows();
        }

        for entry in entries {
            let target = entry.target;
            if table.has_scenario(&target)? {
                log::info!(
                    "target mean {:.2}% spread {:.2}: already in library, skipping",
                    target.mean * 100.0,
                    target.spread
                );
                continue;
            }
            log::info!(
                "generating {quota} paths for target mean {:.2}% spread {:.2}",
                target.mean * 100.0,
                target.spread
            );

            let first_path_id = table.row_count()? as PathId;
            let (rows, yielded) = self.build_scenario(entry, quota, first_path_id)?;
            if yielded.accepted < yielded.generated {
                log::warn!(
                    "target mean {:.2}% spread {:.2}: accepted {}/{} paths",
                    target.mean * 100.0,
                    target.spread,
                    yielded.accepted,
                    yielded.generated
                );
            }
            if rows.is_empty() {
                continue;
            }
            table.append_scenario(&rows)?;
            log::debug!("appended {} rows for target {:?}", rows.len(), target);
        }

        table.rows()
    }
}

/// Build the library with the configured engine settings.
pub fn generate_library(
    config: &EngineConfig,
    entries: &[ParameterLibraryEntry],
    target_size: usize,
    table: &mut dyn StatisticsTable,
) -> SimResult<Vec<FinalStatisticsRow>> {
    LibraryBuilder::new(config.clone())?.generate_library(entries, target_size, table)
}
