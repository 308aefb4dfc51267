use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("No bounds supplied")]
    EmptyBounds,

    #[error("Invalid bounds for dimension {dimension}: [{lower}, {upper}]")]
    InvalidBounds { dimension: usize, lower: f64, upper: f64 },

    #[error("Population of {size} is too small (need at least {minimum})")]
    PopulationTooSmall { size: usize, minimum: usize },

    #[error("Invalid solver setting '{name}': {value}")]
    InvalidSetting { name: &'static str, value: f64 },
}

pub type SolverResult<T> = Result<T, SolverError>;
