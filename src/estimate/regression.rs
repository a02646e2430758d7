//! Single-equation regression estimators.

use crate::data::{Column, ExperimentTable, ModelFrame, ModelSpec, TreatmentEffect};
use crate::error::{Error, Result};
use crate::model::{fit_ols, Covariance};
use crate::test::test_wald;

/// Numeric frame for an experiment, refusing covariate adjustment without a covariate.
pub(crate) fn prepare_frame(table: &ExperimentTable, use_covariate: bool) -> Result<ModelFrame> {
    if use_covariate && !table.has_covariate() {
        return Err(Error::CovariateUnavailable);
    }
    table.to_frame()
}

/// Fit `spec` and report inference on the `is_treatment` coefficient.
pub(crate) fn treatment_coefficient(
    frame: &ModelFrame,
    spec: &ModelSpec,
    covariance: Covariance,
) -> Result<TreatmentEffect> {
    let fit = fit_ols(frame, spec, covariance)?;
    Ok(test_wald(&fit, Column::IsTreatment.name())?.to_effect())
}

/// Regress `response` on `extra` terms, the treatment indicator and optionally the covariate.
fn adjusted_comparison(
    table: &ExperimentTable,
    use_covariate: bool,
    response: Column,
    extra: &[Column],
) -> Result<TreatmentEffect> {
    let frame = prepare_frame(table, use_covariate)?;
    let spec = extra
        .iter()
        .fold(ModelSpec::new(response), |spec, &col| spec.term(col))
        .term(Column::IsTreatment)
        .term_if(use_covariate, Column::Covariate);
    treatment_coefficient(&frame, &spec, Covariance::Iid)
}

/// Post-period comparison: `post_value ~ is_treatment [+ covariate]`.
pub fn t_test(table: &ExperimentTable, use_covariate: bool) -> Result<TreatmentEffect> {
    adjusted_comparison(table, use_covariate, Column::PostValue, &[])
}

/// Change-score comparison: `change ~ is_treatment [+ covariate]`.
pub fn change_score(table: &ExperimentTable, use_covariate: bool) -> Result<TreatmentEffect> {
    adjusted_comparison(table, use_covariate, Column::Change, &[])
}

/// Baseline-adjusted comparison: `post_value ~ pre_value + is_treatment [+ covariate]`.
pub fn autoregression(table: &ExperimentTable, use_covariate: bool) -> Result<TreatmentEffect> {
    adjusted_comparison(table, use_covariate, Column::PostValue, &[Column::PreValue])
}
