//! Sweep of the three standard scenarios.
//!
//! This example shows how to:
//! 1. Configure a small study
//! 2. Simulate and evaluate every scenario
//! 3. Compare estimator accuracy across scenarios
//! 4. Inspect a single experiment by hand

use treatment_bench::prelude::*;

fn main() -> Result<()> {
    println!("=== Treatment Bench Example ===\n");

    let mut study = StudyConfig::default_study();
    study.params.experiments = 200;
    study.params.n = 500;

    println!("Study parameters:");
    println!("  Experiments per scenario: {}", study.params.experiments);
    println!("  Subjects per experiment:  {}", study.params.n);
    println!("  True effect:              {}", study.params.true_effect);
    println!();

    println!("=== Running Scenarios ===\n");

    let outcomes = run_study(&study)?;
    for outcome in &outcomes {
        println!("Scenario '{}':", outcome.scenario);
        print!("{}", format_summaries(&outcome.summaries()));
        if !outcome.evaluation.is_complete() {
            println!("  ({} estimator runs failed)", outcome.evaluation.failures.len());
        }
        println!();
    }

    // Which method is closest to the truth under selection bias?
    if let Some(biased) = outcomes.iter().find(|o| o.scenario == "selection_bias") {
        let summaries = biased.summaries();
        if let Some(best) = summaries
            .iter()
            .min_by(|a, b| a.rmse.total_cmp(&b.rmse))
        {
            println!("Lowest RMSE under selection bias: {} ({:.4})", best.method, best.rmse);
            println!();
        }
    }

    println!("=== Single Experiment ===\n");

    let config = SimulationConfig::new(1000, 1.0, 10.0, 2.0).with_covariate(0.0, 1.0, 2.0);
    let table = simulate(0, &config)?;
    println!(
        "{} subjects, {} treated",
        table.len(),
        table.is_treatment().iter().filter(|&&t| t == 1).count()
    );

    for method in MethodConfig::with_and_without_covariate() {
        let effect = method.run(&table)?;
        println!(
            "  {:<26} {:>8.4}  [{:>7.4}, {:>7.4}]  p={:.2e}",
            method.name(),
            effect.estimate,
            effect.ci_lower,
            effect.ci_upper,
            effect.p_value
        );
    }

    Ok(())
}
