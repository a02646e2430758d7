//! Integration tests for estimator accuracy on simulated experiments.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};
use std::collections::BTreeSet;
use treatment_bench::prelude::*;

/// Build an experiment where post depends on pre, treatment and covariate:
/// `post = 3 + 0.5 * pre + 2 * T - covariate + N(0, 0.5)`.
fn create_linear_experiment(n: usize, seed: u64) -> ExperimentTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let pre_dist = Normal::new(10.0, 2.0).unwrap();
    let cov_dist = Uniform::new_inclusive(0.0, 1.0).unwrap();
    let noise = Normal::new(0.0, 0.5).unwrap();

    let mut pre = Vec::with_capacity(n);
    let mut post = Vec::with_capacity(n);
    let mut treated = Vec::with_capacity(n);
    let mut cov = Vec::with_capacity(n);
    for _ in 0..n {
        let p: f64 = pre_dist.sample(&mut rng);
        let c: f64 = cov_dist.sample(&mut rng);
        let t: u8 = u8::from(rng.random::<f64>() < 0.5);
        post.push(3.0 + 0.5 * p + 2.0 * f64::from(t) - c + noise.sample(&mut rng));
        pre.push(p);
        cov.push(c);
        treated.push(t);
    }
    ExperimentTable::from_columns(0, pre, post, treated, Some(cov), 2.0).unwrap()
}

/// Build an experiment whose pre and post values are negatively correlated.
fn create_anticorrelated_experiment(n: usize, seed: u64) -> ExperimentTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let pre_dist = Normal::new(0.0, 1.0).unwrap();
    let noise = Normal::new(0.0, 0.1).unwrap();

    let pre: Vec<f64> = (0..n).map(|_| pre_dist.sample(&mut rng)).collect();
    let treated: Vec<u8> = (0..n).map(|i| (i % 2) as u8).collect();
    let post: Vec<f64> = pre
        .iter()
        .zip(&treated)
        .map(|(p, &t)| -p + 2.0 * f64::from(t) + noise.sample(&mut rng))
        .collect();
    ExperimentTable::from_columns(0, pre, post, treated, None, 2.0).unwrap()
}

fn estimates_for(results: &ResultTable, method: &str) -> Vec<f64> {
    results.for_method(method).map(|r| r.estimate).collect()
}

fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

#[test]
fn test_covariate_adjusted_estimators_recover_effect() {
    let table = create_linear_experiment(20_000, 42);

    for (estimator, tolerance) in [
        (Estimator::TTest, 0.06),
        (Estimator::ChangeScore, 0.06),
        (Estimator::Autoregression, 0.05),
        (Estimator::Cuped, 0.05),
        (Estimator::DiffInDiff, 0.1),
    ] {
        let effect = estimator.estimate(&table, true).unwrap();
        assert!(
            (effect.estimate - 2.0).abs() < tolerance,
            "{} estimated {}",
            estimator,
            effect.estimate
        );
        assert!(effect.p_value < 1e-10, "{} p = {}", estimator, effect.p_value);
    }
}

#[test]
fn test_unbiased_without_pre_information() {
    let config = SimulationConfig::new(10_000, 2.0, 0.0, 1.0)
        .with_post_baseline(PostBaseline::PopulationMean);
    let ids: Vec<u64> = (0..40).collect();
    let experiments = simulate_batch(&ids, &config).unwrap();

    let evaluation = evaluate_scenario(
        &experiments.group_by_experiment(),
        &MethodConfig::unadjusted(),
    )
    .unwrap();
    assert!(evaluation.is_complete());

    for summary in summarize(&evaluation.results) {
        assert_eq!(summary.count, 40);
        let within = evaluation
            .results
            .for_method(&summary.method)
            .filter(|r| r.error().abs() < 0.1)
            .count();
        assert!(
            within as f64 / 40.0 >= 0.9,
            "{}: only {} of 40 within 0.1",
            summary.method,
            within
        );
        assert!(
            summary.mean_error.abs() < 0.02,
            "{} mean error {}",
            summary.method,
            summary.mean_error
        );
    }
}

#[test]
fn test_simple_comparison_lands_near_truth() {
    // post = pre_mean + effect + N(0, 1), so the t-test standard error is 0.02.
    let config = SimulationConfig::new(10_000, 2.0, 0.0, 1.0)
        .with_post_baseline(PostBaseline::PopulationMean);
    let ids: Vec<u64> = (100..200).collect();
    let experiments = simulate_batch(&ids, &config).unwrap();

    let methods = [MethodConfig::new(Estimator::TTest, false)];
    let results = evaluate_scenario(&experiments.group_by_experiment(), &methods)
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(results.len(), 100);

    let within = results
        .for_method("t_test")
        .filter(|r| (r.estimate - 2.0).abs() < 0.05)
        .count();
    assert!(
        within as f64 / 100.0 > 0.95,
        "only {} of 100 t_test estimates within 0.05 of 2.0",
        within
    );
}

#[test]
fn test_selection_bias_favors_covariate_adjustment() {
    let config = SimulationConfig::new(1000, 1.0, 10.0, 2.0)
        .with_covariate(0.0, 1.0, 2.0)
        .with_selection_bias(0.3);
    let ids: Vec<u64> = (0..30).collect();
    let experiments = simulate_batch(&ids, &config).unwrap();

    let methods = [
        MethodConfig::new(Estimator::TTest, false),
        MethodConfig::new(Estimator::Autoregression, true),
    ];
    let results = evaluate_scenario(&experiments.group_by_experiment(), &methods)
        .unwrap()
        .into_result()
        .unwrap();
    let summaries = summarize(&results);

    let naive = summaries.iter().find(|s| s.method == "t_test").unwrap();
    let adjusted = summaries
        .iter()
        .find(|s| s.method == "autoregression_covariate")
        .unwrap();

    // Treated subjects have higher covariates, which raise the outcome.
    assert!(naive.mean_error > 0.1, "naive bias {}", naive.mean_error);
    assert!(
        naive.mean_absolute_error > adjusted.mean_absolute_error,
        "naive {} vs adjusted {}",
        naive.mean_absolute_error,
        adjusted.mean_absolute_error
    );
}

#[test]
fn test_cuped_reduces_variance() {
    let config = SimulationConfig::new(200, 1.0, 10.0, 2.0);
    let ids: Vec<u64> = (0..100).collect();
    let experiments = simulate_batch(&ids, &config).unwrap();

    let methods = [
        MethodConfig::new(Estimator::TTest, false),
        MethodConfig::new(Estimator::Cuped, false),
    ];
    let results = evaluate_scenario(&experiments.group_by_experiment(), &methods)
        .unwrap()
        .into_result()
        .unwrap();

    let t_test_var = variance(&estimates_for(&results, "t_test"));
    let cuped_var = variance(&estimates_for(&results, "cuped"));
    assert!(
        cuped_var < t_test_var,
        "cuped {} vs t_test {}",
        cuped_var,
        t_test_var
    );
}

#[test]
fn test_clustering_narrows_interval_for_correlated_panel() {
    let config = SimulationConfig::new(1000, 1.0, 10.0, 2.0);
    let table = simulate(5, &config).unwrap();

    let clustered = diff_in_diff(&table, false).unwrap();
    let iid = diff_in_diff_with(&table, false, Covariance::Iid).unwrap();

    assert!((clustered.estimate - iid.estimate).abs() < 1e-9);
    assert!(
        clustered.ci_width() < 0.8 * iid.ci_width(),
        "clustered {} vs iid {}",
        clustered.ci_width(),
        iid.ci_width()
    );
}

#[test]
fn test_clustering_widens_interval_for_anticorrelated_panel() {
    let table = create_anticorrelated_experiment(400, 9);

    let clustered = diff_in_diff(&table, false).unwrap();
    let iid = diff_in_diff_with(&table, false, Covariance::Iid).unwrap();

    assert!(
        clustered.ci_width() > 1.2 * iid.ci_width(),
        "clustered {} vs iid {}",
        clustered.ci_width(),
        iid.ci_width()
    );
}

#[test]
fn test_harness_produces_every_combination() {
    let config = SimulationConfig::new(150, 1.5, 10.0, 2.0)
        .with_covariate(0.0, 1.0, 2.0)
        .with_selection_bias(0.3);
    let ids: Vec<u64> = (0..12).collect();
    let experiments = simulate_batch(&ids, &config).unwrap();
    let methods = MethodConfig::with_and_without_covariate();

    let evaluation = evaluate_scenario(&experiments.group_by_experiment(), &methods).unwrap();
    assert!(evaluation.is_complete());
    assert_eq!(evaluation.skipped, 0);
    assert_eq!(evaluation.results.len(), 12 * methods.len());

    let pairs: BTreeSet<(u64, String)> = evaluation
        .results
        .iter()
        .map(|r| (r.experiment_id, r.method.clone()))
        .collect();
    assert_eq!(pairs.len(), 12 * methods.len());
    assert!(evaluation.results.iter().all(|r| r.true_effect == 1.5));
}

#[test]
fn test_study_from_yaml() {
    let yaml = r#"
name: small
params:
  experiments: 3
  n: 120
  true_effect: 0.5
  target_pre_experiment_mean: 4.0
  target_std: 1.0
  covariate_min: 0.0
  covariate_max: 2.0
  covariate_effect: 1.0
scenarios:
  - name: plain
    has_covariate: false
    methods:
      - estimator: t_test
      - estimator: diff_in_diff
  - name: adjusted
    has_covariate: true
    methods:
      - estimator: cuped
        use_covariate: true
"#;
    let study = StudyConfig::from_yaml(yaml).unwrap();
    assert_eq!(study.params.pre_mean, 4.0);
    assert_eq!(study.params.std, 1.0);

    let outcomes = run_study(&study).unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].results().len(), 3 * 2);
    assert_eq!(outcomes[1].results().methods(), vec!["cuped_covariate"]);

    let dir = tempfile::TempDir::new().unwrap();
    let paths = write_outputs(&outcomes, dir.path()).unwrap();
    let reloaded = ResultTable::from_tsv(&paths[1].results).unwrap();
    assert_eq!(reloaded.len(), 3);
}

#[test]
fn test_selection_bias_requires_covariate() {
    let yaml = r#"
name: broken
params:
  experiments: 2
  n: 50
  true_effect: 1.0
  pre_mean: 0.0
  std: 1.0
  covariate_selection_bias: 0.2
scenarios:
  - name: biased
    has_covariate: false
    has_selection_bias: true
    methods:
      - estimator: t_test
"#;
    let study = StudyConfig::from_yaml(yaml).unwrap();
    assert!(matches!(run_study(&study), Err(Error::InvalidConfig(_))));
}
