//! Treatment-Effect Estimator Benchmark Library
//!
//! This library simulates randomized experiments with known treatment effects
//! and measures how well a menu of estimators recovers them.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (experiment tables, model frames, results)
//! - **model**: OLS fitting with classical or cluster-robust covariance
//! - **test**: Wald test and confidence interval for one coefficient
//! - **simulate**: Seeded synthetic experiment generation
//! - **estimate**: Treatment-effect estimators (t-test, change score,
//!   autoregression, CUPED, difference-in-differences)
//! - **evaluate**: Parallel batch evaluation and per-method summaries
//! - **pipeline**: Study configuration, execution and persistence
//!
//! # Example
//!
//! ```no_run
//! use treatment_bench::prelude::*;
//!
//! let config = SimulationConfig::new(1000, 2.0, 10.0, 1.0).with_covariate(0.0, 1.0, 2.0);
//! let ids: Vec<u64> = (0..100).collect();
//! let experiments = simulate_batch(&ids, &config).unwrap();
//!
//! let evaluation = evaluate_scenario(
//!     &experiments.group_by_experiment(),
//!     &MethodConfig::with_and_without_covariate(),
//! )
//! .unwrap();
//! print!("{}", format_summaries(&summarize(&evaluation.results)));
//! ```

pub mod data;
pub mod error;
pub mod estimate;
pub mod evaluate;
pub mod model;
pub mod pipeline;
pub mod simulate;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{
        Column, DesignMatrix, EvaluationRow, ExperimentRow, ExperimentTable, ModelFrame,
        ModelSpec, ResultTable, Term, TreatmentEffect,
    };
    pub use crate::error::{Error, Result};
    pub use crate::estimate::{
        autoregression, change_score, cuped, diff_in_diff, diff_in_diff_with, reshape_panel,
        t_test, Estimator, MethodConfig,
    };
    pub use crate::evaluate::{
        evaluate_experiment, evaluate_scenario, format_summaries, summarize, EvaluationFailure,
        MethodSummary, ScenarioEvaluation,
    };
    pub use crate::model::{fit_ols, Covariance, OlsFit};
    pub use crate::pipeline::{
        run_scenario, run_study, write_outputs, ScenarioConfig, ScenarioOutcome,
        SimulationParams, StudyConfig,
    };
    pub use crate::simulate::{simulate, simulate_batch, PostBaseline, SimulationConfig};
    pub use crate::test::{test_wald, test_wald_at, CoefficientTest};
}
