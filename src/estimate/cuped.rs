//! CUPED: variance reduction with pre-experiment data.

use crate::data::{Column, ExperimentTable, ModelSpec, TreatmentEffect};
use crate::error::Result;
use crate::estimate::regression::{prepare_frame, treatment_coefficient};
use crate::model::{fit_ols, Covariance};

/// Compare CUPED-adjusted outcomes between arms.
///
/// Slopes `θ` come from `post_value ~ pre_value [+ covariate]`; the adjusted
/// outcome `post − θ_pre (pre − mean(pre)) [− θ_cov (cov − mean(cov))]` is then
/// regressed on `is_treatment`.
pub fn cuped(table: &ExperimentTable, use_covariate: bool) -> Result<TreatmentEffect> {
    let mut frame = prepare_frame(table, use_covariate)?;

    let adjusters: Vec<Column> = std::iter::once(Column::PreValue)
        .chain(use_covariate.then_some(Column::Covariate))
        .collect();
    let theta_spec = adjusters
        .iter()
        .fold(ModelSpec::new(Column::PostValue), |spec, &col| spec.term(col));
    let theta_fit = fit_ols(&frame, &theta_spec, Covariance::Iid)?;

    let mut adjusted = frame.column(Column::PostValue)?.to_vec();
    for &col in &adjusters {
        let theta = theta_fit.estimate(col.name())?;
        let mean = frame.mean(col)?;
        for (y, x) in adjusted.iter_mut().zip(frame.column(col)?) {
            *y -= theta * (x - mean);
        }
    }
    frame.insert(Column::AdjustedOutcome, adjusted)?;

    let spec = ModelSpec::new(Column::AdjustedOutcome).term(Column::IsTreatment);
    treatment_coefficient(&frame, &spec, Covariance::Iid)
}
