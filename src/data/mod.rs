//! Data structures for experiments, model inputs and evaluation results.

mod column;
mod design_matrix;
mod experiment;
mod formula;
mod frame;
mod result;

pub use column::Column;
pub use design_matrix::{DesignMatrix, INTERCEPT};
pub use experiment::{ExperimentRow, ExperimentTable};
pub use formula::{ModelSpec, Term};
pub use frame::ModelFrame;
pub use result::{EvaluationRow, ResultTable, TreatmentEffect};
