//! Study runner: simulate and evaluate every scenario, then persist the tables.

use crate::data::{ExperimentTable, ResultTable};
use crate::error::{Error, Result};
use crate::estimate::MethodConfig;
use crate::evaluate::{evaluate_scenario, summarize, MethodSummary, ScenarioEvaluation};
use crate::pipeline::config::{is_valid_scenario_name, ScenarioConfig, SimulationParams, StudyConfig};
use crate::simulate::simulate_batch;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Simulated data and evaluation for one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub experiments: ExperimentTable,
    pub evaluation: ScenarioEvaluation,
}

impl ScenarioOutcome {
    pub fn results(&self) -> &ResultTable {
        &self.evaluation.results
    }

    /// Per-method accuracy summaries.
    pub fn summaries(&self) -> Vec<MethodSummary> {
        summarize(&self.evaluation.results)
    }
}

/// Simulate one scenario and evaluate its methods.
pub fn run_scenario(params: &SimulationParams, scenario: &ScenarioConfig) -> Result<ScenarioOutcome> {
    let config = params.config_for(scenario)?;
    info!(scenario = %scenario.name, "running scenario");

    let experiments = simulate_batch(&params.experiment_ids(), &config)?;
    let evaluation = evaluate_scenario(&experiments.group_by_experiment(), &scenario.methods)?;
    if !evaluation.is_complete() {
        warn!(
            scenario = %scenario.name,
            failures = evaluation.failures.len(),
            "some estimator runs failed"
        );
    }

    Ok(ScenarioOutcome {
        scenario: scenario.name.clone(),
        experiments,
        evaluation,
    })
}

/// Run every scenario of a study.
///
/// The whole configuration is validated before any scenario is simulated.
/// Numerical estimator failures are kept in each outcome's evaluation rather
/// than aborting the study.
pub fn run_study(study: &StudyConfig) -> Result<Vec<ScenarioOutcome>> {
    study.validate()?;
    info!(
        study = %study.name,
        scenarios = study.scenarios.len(),
        experiments = study.params.experiments,
        n = study.params.n,
        "starting study"
    );

    study
        .scenarios
        .iter()
        .map(|scenario| run_scenario(&study.params, scenario))
        .collect()
}

/// Evaluate an already simulated table (possibly holding many experiments).
pub fn evaluate_table(table: &ExperimentTable, methods: &[MethodConfig]) -> Result<ScenarioEvaluation> {
    evaluate_scenario(&table.group_by_experiment(), methods)
}

/// Paths written by [`write_outputs`] for one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub experiments: PathBuf,
    pub results: PathBuf,
    /// Written only when some estimator runs failed.
    pub failures: Option<PathBuf>,
}

/// Write `experiments/<scenario>.tsv` and `results/<scenario>.tsv` under `dir`.
pub fn write_outputs<P: AsRef<Path>>(outcomes: &[ScenarioOutcome], dir: P) -> Result<Vec<OutputPaths>> {
    if let Some(bad) = outcomes.iter().find(|o| !is_valid_scenario_name(&o.scenario)) {
        return Err(Error::InvalidConfig(format!(
            "Scenario name '{}' cannot be used as a file name",
            bad.scenario
        )));
    }

    let experiments_dir = dir.as_ref().join("experiments");
    let results_dir = dir.as_ref().join("results");
    fs::create_dir_all(&experiments_dir)?;
    fs::create_dir_all(&results_dir)?;

    let mut written = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let experiments = experiments_dir.join(format!("{}.tsv", outcome.scenario));
        let results = results_dir.join(format!("{}.tsv", outcome.scenario));
        outcome.experiments.to_tsv(&experiments)?;
        outcome.evaluation.results.to_tsv(&results)?;

        let failures = if outcome.evaluation.failures.is_empty() {
            None
        } else {
            let path = results_dir.join(format!("{}.failures.tsv", outcome.scenario));
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(BufWriter::new(File::create(&path)?));
            for failure in &outcome.evaluation.failures {
                wtr.serialize(failure)?;
            }
            wtr.flush()?;
            Some(path)
        };

        info!(
            scenario = %outcome.scenario,
            rows = outcome.evaluation.results.len(),
            path = %results.display(),
            "wrote scenario outputs"
        );
        written.push(OutputPaths {
            experiments,
            results,
            failures,
        });
    }
    Ok(written)
}
