//! Data-generating engine for synthetic randomized experiments.

mod config;
mod generate;

pub use config::{treatment_probability, CovariateParams, PostBaseline, SimulationConfig};
pub use generate::{simulate, simulate_batch};
