//! Read-only view over a finished library database.
//!
//! Both tables are loaded on first use and cached for the catalog's
//! lifetime; later calls never touch the database again.

use crate::{
    calibrator::ParameterLibraryEntry,
    error::SimResult,
    library::FinalStatisticsRow,
    store::{LibraryStore, ParameterTable, StatisticsTable},
    types::ScenarioTarget,
};
use std::sync::OnceLock;

pub struct TableCatalog {
    store: LibraryStore,
    parameters: OnceLock<Vec<ParameterLibraryEntry>>,
    statistics: OnceLock<Vec<FinalStatisticsRow>>,
}

impl TableCatalog {
    /// Open an existing library database read-only.
    pub fn open(path: &str) -> SimResult<Self> {
        Ok(Self::from_store(LibraryStore::open_read_only(path)?))
    }

    pub fn from_store(store: LibraryStore) -> Self {
        Self {
            store,
            parameters: OnceLock::new(),
            statistics: OnceLock::new(),
        }
    }

    pub fn load_parameter_table(&self) -> SimResult<&[ParameterLibraryEntry]> {
        if self.parameters.get().is_none() {
            let entries = self.store.entries()?;
            log::debug!("catalog loaded {} parameter rows", entries.len());
            let _ = self.parameters.set(entries);
        }
        Ok(self.parameters.get().map(Vec::as_slice).unwrap_or_default())
    }

    pub fn load_statistics_table(&self) -> SimResult<&[FinalStatisticsRow]> {
        if self.statistics.get().is_none() {
            let rows = self.store.rows()?;
            log::debug!("catalog loaded {} statistics rows", rows.len());
            let _ = self.statistics.set(rows);
        }
        Ok(self.statistics.get().map(Vec::as_slice).unwrap_or_default())
    }

    /// Statistics rows of one scenario; empty for an unknown target.
    pub fn scenario_rows(&self, target: &ScenarioTarget) -> SimResult<Vec<FinalStatisticsRow>> {
        Ok(self
            .load_statistics_table()?
            .iter()
            .filter(|row| target.matches(&row.target))
            .cloned()
            .collect())
    }

    /// Distinct scenario targets in the statistics table, by (mean, spread).
    pub fn available_scenarios(&self) -> SimResult<Vec<ScenarioTarget>> {
        let mut targets: Vec<ScenarioTarget> = Vec::new();
        for row in self.load_statistics_table()? {
            if !targets.iter().any(|t| t.matches(&row.target)) {
                targets.push(row.target);
            }
        }
        targets.sort_by(|a, b| a.mean.total_cmp(&b.mean).then(a.spread.total_cmp(&b.spread)));
        Ok(targets)
    }

    /// Calibrated parameters for one target, if present.
    pub fn parameters_for(&self, target: &ScenarioTarget) -> SimResult<Option<ParameterLibraryEntry>> {
        Ok(self
            .load_parameter_table()?
            .iter()
            .find(|entry| target.matches(&entry.target))
            .cloned())
    }
}
