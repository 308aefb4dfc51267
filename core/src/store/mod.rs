//! Append-only tables for calibrated parameters and path statistics.
//!
//! RULE: Only the store module talks to the database.
//! The calibrator and library builder see the two table traits below and
//! never execute SQL directly, so the resume contract does not depend on
//! the storage technology.

mod memory;
mod parameter;
mod statistics;

pub use memory::MemoryTables;

use crate::{
    calibrator::ParameterLibraryEntry,
    error::SimResult,
    library::FinalStatisticsRow,
    types::ScenarioTarget,
};
use rusqlite::{Connection, OpenFlags};

/// Calibrated parameters, keyed by scenario target.
pub trait ParameterTable {
    /// True if a row for `target` exists (approximate float match).
    fn exists(&self, target: &ScenarioTarget) -> SimResult<bool>;

    /// Append and make durable before returning.
    fn append(&mut self, entry: &ParameterLibraryEntry) -> SimResult<()>;

    /// All rows in the order they were appended.
    fn entries(&self) -> SimResult<Vec<ParameterLibraryEntry>>;
}

/// Per-path statistics, appended one whole scenario at a time.
pub trait StatisticsTable {
    fn has_scenario(&self, target: &ScenarioTarget) -> SimResult<bool>;

    /// Append every row of one scenario atomically.
    fn append_scenario(&mut self, rows: &[FinalStatisticsRow]) -> SimResult<()>;

    fn row_count(&self) -> SimResult<usize>;

    /// All rows in path_id order.
    fn rows(&self) -> SimResult<Vec<FinalStatisticsRow>>;
}

pub struct LibraryStore {
    conn: Connection,
}

impl LibraryStore {
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an existing database for reading only.
    pub fn open_read_only(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_parameter_library.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_path_statistics.sql"))?;
        Ok(())
    }
}
