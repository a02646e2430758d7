//! Batch evaluation of estimators across many experiments.

use crate::data::{EvaluationRow, ExperimentTable, ResultTable};
use crate::error::{Error, Result};
use crate::estimate::MethodConfig;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// One estimator that failed on one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationFailure {
    pub experiment_id: u64,
    pub method: String,
    pub message: String,
}

/// Rows and failures collected for a scenario (or part of one).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioEvaluation {
    pub results: ResultTable,
    pub failures: Vec<EvaluationFailure>,
    /// Covariate-adjusted methods skipped on covariate-free experiments.
    pub skipped: usize,
}

impl ScenarioEvaluation {
    /// Concatenate partial evaluations.
    pub fn merge(parts: impl IntoIterator<Item = ScenarioEvaluation>) -> Self {
        let mut rows = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = 0;
        for part in parts {
            rows.extend(part.results);
            failures.extend(part.failures);
            skipped += part.skipped;
        }
        Self {
            results: ResultTable::new(rows),
            failures,
            skipped,
        }
    }

    /// Whether every attempted combination produced a row.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The result table, or the first failed combination (by experiment id,
    /// then method name) as [`Error::EstimationFailed`].
    pub fn into_result(mut self) -> Result<ResultTable> {
        self.failures.sort_by(|a, b| {
            a.experiment_id
                .cmp(&b.experiment_id)
                .then_with(|| a.method.cmp(&b.method))
        });
        match self.failures.into_iter().next() {
            Some(f) => Err(Error::EstimationFailed {
                experiment_id: f.experiment_id,
                method: f.method,
                message: f.message,
            }),
            None => Ok(self.results),
        }
    }
}

/// Number of experiments handed to each parallel task.
pub fn batch_size(n_experiments: usize, n_threads: usize) -> usize {
    (n_experiments / (n_threads.max(1) * 4)).max(1)
}

/// Ground-truth effect of one experiment, checking that the table holds exactly
/// that experiment with a single true effect.
fn experiment_truth(experiment_id: u64, table: &ExperimentTable) -> Result<f64> {
    let Some(truth) = table.true_effect() else {
        return Err(Error::InsufficientData(format!(
            "experiment {} has no rows",
            experiment_id
        )));
    };
    let ids = table.experiment_ids();
    if ids != [experiment_id] {
        return Err(Error::InvalidConfig(format!(
            "table for experiment {} holds rows of experiments {:?}",
            experiment_id, ids
        )));
    }
    if table.rows().any(|r| r.true_effect != truth) {
        return Err(Error::InvalidConfig(format!(
            "experiment {} has more than one true_effect",
            experiment_id
        )));
    }
    Ok(truth)
}

/// Run every method on one experiment.
///
/// Covariate-adjusted methods are skipped when the experiment has no
/// covariate. Numerical failures are recorded and do not stop the remaining
/// methods; any other error aborts the call.
pub fn evaluate_experiment(
    experiment_id: u64,
    table: &ExperimentTable,
    methods: &[MethodConfig],
) -> Result<ScenarioEvaluation> {
    let mut out = ScenarioEvaluation::default();
    let truth = match experiment_truth(experiment_id, table) {
        Ok(truth) => Ok(truth),
        Err(e) if e.is_numerical() => Err(e.to_string()),
        Err(e) => return Err(e),
    };

    for method in methods {
        let name = method.name();
        if method.use_covariate && !table.has_covariate() {
            debug!(experiment_id, method = %name, "skipping covariate method on covariate-free experiment");
            out.skipped += 1;
            continue;
        }

        let outcome = match &truth {
            Err(message) => Err(message.clone()),
            Ok(truth) => match method.run(table) {
                Ok(effect) => Ok((effect, *truth)),
                Err(e) if e.is_numerical() => Err(e.to_string()),
                Err(e) => return Err(e),
            },
        };

        match outcome {
            Ok((effect, truth)) => {
                out.results
                    .push(EvaluationRow::new(experiment_id, name, effect, truth));
            }
            Err(message) => {
                warn!(experiment_id, method = %name, error = %message, "estimator failed");
                out.failures.push(EvaluationFailure {
                    experiment_id,
                    method: name,
                    message,
                });
            }
        }
    }

    Ok(out)
}

/// Run every method on every experiment in parallel batches.
///
/// Batches only read the shared inputs; their outputs are concatenated once
/// all batches finish. Row order is not meaningful. A configuration error in
/// any combination aborts the whole call with no partial result.
pub fn evaluate_scenario(
    experiments: &BTreeMap<u64, ExperimentTable>,
    methods: &[MethodConfig],
) -> Result<ScenarioEvaluation> {
    let ids: Vec<u64> = experiments.keys().copied().collect();
    let size = batch_size(ids.len(), rayon::current_num_threads());
    info!(
        experiments = ids.len(),
        methods = methods.len(),
        batch_size = size,
        "evaluating scenario"
    );

    let parts = ids
        .par_chunks(size)
        .map(|batch| {
            let evaluated = batch
                .iter()
                .filter_map(|id| {
                    experiments
                        .get(id)
                        .map(|table| evaluate_experiment(*id, table, methods))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ScenarioEvaluation::merge(evaluated))
        })
        .collect::<Result<Vec<_>>>()?;

    let evaluation = ScenarioEvaluation::merge(parts);
    info!(
        rows = evaluation.results.len(),
        failures = evaluation.failures.len(),
        skipped = evaluation.skipped,
        "scenario evaluated"
    );
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::Estimator;
    use crate::simulate::{simulate_batch, SimulationConfig};

    fn experiments(with_covariate: bool, k: u64) -> BTreeMap<u64, ExperimentTable> {
        let mut config = SimulationConfig::new(60, 1.0, 0.0, 1.0);
        if with_covariate {
            config = config.with_covariate(0.0, 1.0, 1.0);
        }
        let ids: Vec<u64> = (0..k).collect();
        simulate_batch(&ids, &config).unwrap().group_by_experiment()
    }

    #[test]
    fn test_batch_size() {
        assert_eq!(batch_size(0, 8), 1);
        assert_eq!(batch_size(10, 8), 1);
        assert_eq!(batch_size(1000, 8), 31);
        assert_eq!(batch_size(100, 0), 25);
    }

    #[test]
    fn test_complete_grid() {
        let data = experiments(true, 6);
        let methods = MethodConfig::with_and_without_covariate();
        let evaluation = evaluate_scenario(&data, &methods).unwrap();

        assert!(evaluation.is_complete());
        assert_eq!(evaluation.skipped, 0);
        assert_eq!(evaluation.results.len(), 6 * methods.len());
        for id in 0..6 {
            for m in &methods {
                let count = evaluation
                    .results
                    .iter()
                    .filter(|r| r.experiment_id == id && r.method == m.name())
                    .count();
                assert_eq!(count, 1);
            }
        }
        assert!(evaluation.results.iter().all(|r| r.true_effect == 1.0));
    }

    #[test]
    fn test_covariate_methods_skipped_without_covariate() {
        let data = experiments(false, 3);
        let methods = vec![
            MethodConfig::new(Estimator::TTest, false),
            MethodConfig::new(Estimator::TTest, true),
            MethodConfig::new(Estimator::Cuped, true),
        ];
        let evaluation = evaluate_scenario(&data, &methods).unwrap();

        assert!(evaluation.is_complete());
        assert_eq!(evaluation.skipped, 6);
        assert_eq!(evaluation.results.len(), 3);
        assert_eq!(evaluation.results.methods(), vec!["t_test"]);
    }

    #[test]
    fn test_failure_recorded_without_aborting() {
        let mut data = experiments(false, 3);
        // Every subject treated: the treatment column is collinear with the intercept.
        let degenerate = ExperimentTable::from_columns(
            1,
            vec![1.0, 2.0, 3.0, 4.0],
            vec![2.0, 3.0, 5.0, 4.0],
            vec![1, 1, 1, 1],
            None,
            1.0,
        )
        .unwrap();
        data.insert(1, degenerate);

        let methods = vec![MethodConfig::new(Estimator::TTest, false)];
        let evaluation = evaluate_scenario(&data, &methods).unwrap();

        assert_eq!(evaluation.results.len(), 2);
        assert_eq!(evaluation.failures.len(), 1);
        assert_eq!(evaluation.failures[0].experiment_id, 1);
        assert!(evaluation.failures[0].message.contains("Singular design"));

        let err = evaluation.into_result().unwrap_err();
        assert!(matches!(
            err,
            Error::EstimationFailed { experiment_id: 1, ref method, .. } if method == "t_test"
        ));
    }

    #[test]
    fn test_matches_sequential_evaluation() {
        let data = experiments(true, 5);
        let methods = vec![
            MethodConfig::new(Estimator::Autoregression, true),
            MethodConfig::new(Estimator::DiffInDiff, false),
        ];
        let mut parallel = evaluate_scenario(&data, &methods)
            .unwrap()
            .into_result()
            .unwrap();
        let sequential: Vec<ScenarioEvaluation> = data
            .iter()
            .map(|(id, t)| evaluate_experiment(*id, t, &methods).unwrap())
            .collect();
        let mut sequential = ScenarioEvaluation::merge(sequential).into_result().unwrap();
        parallel.sort();
        sequential.sort();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_configuration_error_aborts_scenario() {
        let mut data = experiments(false, 4);
        // Keyed as experiment 2 but holding the rows of experiment 9.
        let mislabeled = ExperimentTable::from_columns(
            9,
            vec![1.0, 2.0, 3.0, 4.0, 2.5],
            vec![2.0, 3.5, 3.0, 5.5, 2.0],
            vec![0, 1, 0, 1, 0],
            None,
            1.0,
        )
        .unwrap();
        data.insert(2, mislabeled);

        let methods = vec![MethodConfig::new(Estimator::TTest, false)];
        let err = evaluate_scenario(&data, &methods).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("experiment 2")));
        assert!(!err.is_numerical());
    }

    #[test]
    fn test_mixed_true_effects_rejected() {
        let table = ExperimentTable::concat(vec![
            ExperimentTable::from_columns(3, vec![1.0, 2.0], vec![1.5, 2.5], vec![0, 1], None, 1.0)
                .unwrap(),
            ExperimentTable::from_columns(3, vec![1.0, 2.0], vec![1.5, 2.5], vec![0, 1], None, 2.0)
                .unwrap(),
        ])
        .unwrap();
        let methods = vec![MethodConfig::new(Estimator::TTest, false)];
        assert!(matches!(
            evaluate_experiment(3, &table, &methods),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_experiment_recorded_as_numerical_failure() {
        let methods = vec![
            MethodConfig::new(Estimator::TTest, false),
            MethodConfig::new(Estimator::Cuped, false),
        ];
        let evaluation = evaluate_experiment(5, &ExperimentTable::default(), &methods).unwrap();
        assert!(evaluation.results.is_empty());
        assert_eq!(evaluation.failures.len(), 2);
        assert!(evaluation.failures.iter().all(|f| f.experiment_id == 5));
    }
}
