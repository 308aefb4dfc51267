use super::{LibraryStore, StatisticsTable};
use crate::{
    error::SimResult,
    library::FinalStatisticsRow,
    types::{ScenarioTarget, TARGET_ATOL, TARGET_RTOL},
};
use rusqlite::params;

impl StatisticsTable for LibraryStore {
    fn has_scenario(&self, target: &ScenarioTarget) -> SimResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM path_statistics
             WHERE ABS(target_mean - ?1)   <= ?3 + ?4 * ABS(?1)
               AND ABS(target_spread - ?2) <= ?3 + ?4 * ABS(?2)",
            params![target.mean, target.spread, TARGET_ATOL, TARGET_RTOL],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn append_scenario(&mut self, rows: &[FinalStatisticsRow]) -> SimResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO path_statistics (
                    path_id, target_mean, target_spread, actual_annual_return,
                    actual_spread, scenario_p05_price, scenario_p95_price,
                    max_drop, lost_decades
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.path_id as i64,
                    row.target.mean,
                    row.target.spread,
                    row.actual_annual_return,
                    row.actual_spread,
                    row.scenario_p05_price,
                    row.scenario_p95_price,
                    row.max_drop,
                    row.lost_decades as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn row_count(&self) -> SimResult<usize> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM path_statistics", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn rows(&self) -> SimResult<Vec<FinalStatisticsRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT path_id, target_mean, target_spread, actual_annual_return,
                    actual_spread, scenario_p05_price, scenario_p95_price,
                    max_drop, lost_decades
             FROM path_statistics ORDER BY path_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FinalStatisticsRow {
                    path_id:              row.get::<_, i64>(0)? as u64,
                    target:               ScenarioTarget::new(row.get(1)?, row.get(2)?),
                    actual_annual_return: row.get(3)?,
                    actual_spread:        row.get(4)?,
                    scenario_p05_price:   row.get(5)?,
                    scenario_p95_price:   row.get(6)?,
                    max_drop:             row.get(7)?,
                    lost_decades:         row.get::<_, i64>(8)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
