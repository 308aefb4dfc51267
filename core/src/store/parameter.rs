use super::{LibraryStore, ParameterTable};
use crate::{
    calibrator::ParameterLibraryEntry,
    error::SimResult,
    params::CalibratedParameters,
    types::{ScenarioTarget, TARGET_ATOL, TARGET_RTOL},
};
use rusqlite::params;

impl ParameterTable for LibraryStore {
    fn exists(&self, target: &ScenarioTarget) -> SimResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM parameter_library
             WHERE ABS(target_mean - ?1)   <= ?3 + ?4 * ABS(?1)
               AND ABS(target_spread - ?2) <= ?3 + ?4 * ABS(?2)",
            params![target.mean, target.spread, TARGET_ATOL, TARGET_RTOL],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn append(&mut self, entry: &ParameterLibraryEntry) -> SimResult<()> {
        // Autocommit: the row is durable once execute returns.
        self.conn.execute(
            "INSERT INTO parameter_library (
                target_mean, target_spread, opt_mu, opt_sigma, opt_kappa,
                final_loss, converged, calibrated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.target.mean,
                entry.target.spread,
                entry.params.mu,
                entry.params.sigma,
                entry.params.kappa,
                entry.loss,
                entry.converged,
                entry.calibrated_at,
            ],
        )?;
        Ok(())
    }

    fn entries(&self) -> SimResult<Vec<ParameterLibraryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT target_mean, target_spread, opt_mu, opt_sigma, opt_kappa,
                    final_loss, converged, calibrated_at
             FROM parameter_library ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(ParameterLibraryEntry {
                    target:        ScenarioTarget::new(row.get(0)?, row.get(1)?),
                    params:        CalibratedParameters::new(row.get(2)?, row.get(3)?, row.get(4)?),
                    loss:          row.get(5)?,
                    converged:     row.get(6)?,
                    calibrated_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
