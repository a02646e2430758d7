//! Batch evaluation harness and result summaries.

pub mod harness;
pub mod summary;

pub use harness::{
    batch_size, evaluate_experiment, evaluate_scenario, EvaluationFailure, ScenarioEvaluation,
};
pub use summary::{format_summaries, summarize, MethodSummary, REJECTION_ALPHA};
