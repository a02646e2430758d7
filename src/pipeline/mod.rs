//! Study configuration and execution.

mod config;
mod runner;

pub use config::{ScenarioConfig, SimulationParams, StudyConfig};
pub use runner::{
    evaluate_table, run_scenario, run_study, write_outputs, OutputPaths, ScenarioOutcome,
};
