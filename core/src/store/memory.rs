use super::{ParameterTable, StatisticsTable};
use crate::{
    calibrator::ParameterLibraryEntry,
    error::SimResult,
    library::FinalStatisticsRow,
    types::ScenarioTarget,
};

/// Both tables held in process memory. Nothing survives the process;
/// useful for tests and for one-shot runs that export elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    pub parameters: Vec<ParameterLibraryEntry>,
    pub statistics: Vec<FinalStatisticsRow>,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParameterTable for MemoryTables {
    fn exists(&self, target: &ScenarioTarget) -> SimResult<bool> {
        Ok(self.parameters.iter().any(|e| target.matches(&e.target)))
    }

    fn append(&mut self, entry: &ParameterLibraryEntry) -> SimResult<()> {
        self.parameters.push(entry.clone());
        Ok(())
    }

    fn entries(&self) -> SimResult<Vec<ParameterLibraryEntry>> {
        Ok(self.parameters.clone())
    }
}

impl StatisticsTable for MemoryTables {
    fn has_scenario(&self, target: &ScenarioTarget) -> SimResult<bool> {
        Ok(self.statistics.iter().any(|r| target.matches(&r.target)))
    }

    fn append_scenario(&mut self, rows: &[FinalStatisticsRow]) -> SimResult<()> {
        self.statistics.extend_from_slice(rows);
        Ok(())
    }

    fn row_count(&self) -> SimResult<usize> {
        Ok(self.statistics.len())
    }

    fn rows(&self) -> SimResult<Vec<FinalStatisticsRow>> {
        Ok(self.statistics.clone())
    }
}
