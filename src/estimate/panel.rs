//! Two-period difference-in-differences on a reshaped panel.

use crate::data::{Column, ExperimentTable, ModelFrame, ModelSpec, Term, TreatmentEffect};
use crate::error::Result;
use crate::estimate::regression::prepare_frame;
use crate::model::{fit_ols, Covariance};
use crate::test::test_wald;

/// Stack an experiment into a two-period panel.
///
/// Rows `0..n` hold the pre period (`time = 0`, `target = pre_value`) and rows
/// `n..2n` the post period (`time = 1`, `target = post_value`). Treatment and
/// covariate repeat across periods, and `subject_id` is the original row index.
pub fn reshape_panel(table: &ExperimentTable, use_covariate: bool) -> Result<ModelFrame> {
    let frame = prepare_frame(table, use_covariate)?;
    let n = frame.n_rows();
    let twice = |col: Column| -> Result<Vec<f64>> {
        let values = frame.column(col)?;
        Ok(values.iter().chain(values).copied().collect())
    };

    let time: Vec<f64> = std::iter::repeat(0.0)
        .take(n)
        .chain(std::iter::repeat(1.0).take(n))
        .collect();
    let target: Vec<f64> = frame
        .column(Column::PreValue)?
        .iter()
        .chain(frame.column(Column::PostValue)?)
        .copied()
        .collect();
    let subject: Vec<f64> = (0..n).chain(0..n).map(|i| i as f64).collect();

    let mut panel = ModelFrame::new(2 * n)
        .with_column(Column::Time, time)?
        .with_column(Column::Target, target)?
        .with_column(Column::IsTreatment, twice(Column::IsTreatment)?)?
        .with_column(Column::SubjectId, subject)?;
    if use_covariate {
        panel.insert(Column::Covariate, twice(Column::Covariate)?)?;
    }
    Ok(panel)
}

/// `target ~ time * is_treatment [+ covariate]`.
pub fn panel_spec(use_covariate: bool) -> ModelSpec {
    ModelSpec::new(Column::Target)
        .crossed(Column::Time, Column::IsTreatment)
        .term_if(use_covariate, Column::Covariate)
}

/// Name of the difference-in-differences coefficient.
pub fn interaction_name() -> String {
    Term::Interaction(Column::Time, Column::IsTreatment).coefficient_name()
}

/// Difference-in-differences with standard errors clustered by subject.
pub fn diff_in_diff(table: &ExperimentTable, use_covariate: bool) -> Result<TreatmentEffect> {
    diff_in_diff_with(table, use_covariate, Covariance::Cluster(Column::SubjectId))
}

/// Difference-in-differences with an explicit covariance choice.
pub fn diff_in_diff_with(
    table: &ExperimentTable,
    use_covariate: bool,
    covariance: Covariance,
) -> Result<TreatmentEffect> {
    let panel = reshape_panel(table, use_covariate)?;
    let fit = fit_ols(&panel, &panel_spec(use_covariate), covariance)?;
    Ok(test_wald(&fit, &interaction_name())?.to_effect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::estimate::change_score;
    use approx::assert_relative_eq;

    fn create_test_table(with_covariate: bool) -> ExperimentTable {
        ExperimentTable::from_columns(
            0,
            vec![1.0, 2.0, 1.5, 2.5, 0.5, 1.0, 2.0, 3.0],
            vec![1.2, 3.9, 1.4, 4.6, 0.9, 3.2, 2.1, 5.2],
            vec![0, 1, 0, 1, 0, 1, 0, 1],
            with_covariate.then(|| vec![0.3, 0.1, 0.9, 0.4, 0.2, 0.8, 0.5, 0.7]),
            2.0,
        )
        .unwrap()
    }

    #[test]
    fn test_reshape_layout() {
        let table = create_test_table(true);
        let panel = reshape_panel(&table, true).unwrap();

        assert_eq!(panel.n_rows(), 16);
        let time = panel.column(Column::Time).unwrap();
        assert!(time[..8].iter().all(|&t| t == 0.0));
        assert!(time[8..].iter().all(|&t| t == 1.0));
        let target = panel.column(Column::Target).unwrap();
        assert_eq!(&target[..8], table.pre_value());
        assert_eq!(&target[8..], table.post_value());
        let subject = panel.column(Column::SubjectId).unwrap();
        assert_eq!(subject[3], subject[11]);
        let cov = panel.column(Column::Covariate).unwrap();
        assert_eq!(&cov[..8], &cov[8..]);
    }

    #[test]
    fn test_reshape_without_covariate() {
        let panel = reshape_panel(&create_test_table(true), false).unwrap();
        assert!(!panel.has_column(Column::Covariate));
        assert!(matches!(
            reshape_panel(&create_test_table(false), true),
            Err(Error::CovariateUnavailable)
        ));
    }

    #[test]
    fn test_interaction_equals_change_score_estimate() {
        let table = create_test_table(false);
        let did = diff_in_diff(&table, false).unwrap();
        let change = change_score(&table, false).unwrap();
        assert_relative_eq!(did.estimate, change.estimate, epsilon = 1e-10);
    }

    #[test]
    fn test_clustering_changes_interval() {
        let table = create_test_table(false);
        let clustered = diff_in_diff(&table, false).unwrap();
        let iid = diff_in_diff_with(&table, false, Covariance::Iid).unwrap();
        assert_relative_eq!(clustered.estimate, iid.estimate, epsilon = 1e-12);
        assert!((clustered.ci_width() - iid.ci_width()).abs() > 1e-6);
    }

    #[test]
    fn test_spec_display() {
        assert_eq!(
            panel_spec(true).to_string(),
            "target ~ time + is_treatment + time:is_treatment + covariate"
        );
        assert_eq!(interaction_name(), "time:is_treatment");
    }
}
