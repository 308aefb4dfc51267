//! Synthetic long-horizon price paths: a tanh-reverting diffusion overlaid
//! with clustered crisis shocks, calibrated per (mean return, spread)
//! scenario and persisted as a path-statistics library.

pub mod calibrator;
pub mod capping;
pub mod catalog;
pub mod config;
pub mod envelope;
pub mod error;
pub mod generator;
pub mod library;
pub mod params;
pub mod pipeline;
pub mod report;
pub mod rng;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod types;

pub use calibrator::{calibrate, Calibrator, ParameterLibraryEntry};
pub use config::EngineConfig;
pub use error::{SimError, SimResult};
pub use library::{generate_library, FinalStatisticsRow, LibraryBuilder};
pub use params::{CalibratedParameters, ProcessParameters};
pub use types::ScenarioTarget;
