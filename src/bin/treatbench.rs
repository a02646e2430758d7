//! treatbench - treatment-effect estimator benchmark CLI
//!
//! Simulates randomized experiments and evaluates estimators on them.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use treatment_bench::data::{ExperimentTable, ResultTable};
use treatment_bench::error::Result;
use treatment_bench::estimate::MethodConfig;
use treatment_bench::evaluate::{format_summaries, summarize, ScenarioEvaluation};
use treatment_bench::pipeline::{evaluate_table, run_study, write_outputs, StudyConfig};
use treatment_bench::simulate::simulate_batch;

/// Output format for summaries
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Treatment-effect estimator benchmark
#[derive(Parser)]
#[command(name = "treatbench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    /// Worker threads (0 = one per core)
    #[arg(long, global = true, default_value = "0")]
    threads: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate the experiments of one scenario
    Simulate {
        /// Study configuration YAML (default study if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Scenario name within the study
        #[arg(short, long)]
        scenario: String,

        /// Override the number of experiments
        #[arg(short, long)]
        experiments: Option<u64>,

        /// Output path for the experiment TSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Evaluate estimators on a simulated experiment TSV
    Evaluate {
        /// Experiment TSV written by `simulate`
        #[arg(short, long)]
        input: PathBuf,

        /// Comma-separated method names, e.g. "t_test,cuped_covariate" (default: all)
        #[arg(short, long, value_delimiter = ',')]
        methods: Vec<String>,

        /// Output path for the result TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Exit with an error if any estimator run failed
        #[arg(long)]
        strict: bool,
    },

    /// Simulate and evaluate every scenario of a study
    Run {
        /// Study configuration YAML (default study if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory receiving experiments/ and results/
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Exit with an error if any estimator run failed
        #[arg(long)]
        strict: bool,
    },

    /// Summarize a result TSV per method
    Summarize {
        /// Result TSV written by `evaluate` or `run`
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Write an example study configuration
    Example {
        /// Output path for the YAML file
        #[arg(short, long, default_value = "study.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    if cli.threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
        {
            tracing::warn!(error = %e, "could not configure thread pool");
        }
    }

    let result = match cli.command {
        Commands::Simulate {
            config,
            scenario,
            experiments,
            output,
        } => cmd_simulate(config.as_deref(), &scenario, experiments, &output),

        Commands::Evaluate {
            input,
            methods,
            output,
            strict,
        } => cmd_evaluate(&input, &methods, &output, strict),

        Commands::Run {
            config,
            output_dir,
            strict,
        } => cmd_run(config.as_deref(), &output_dir, strict),

        Commands::Summarize { input, format } => cmd_summarize(&input, format),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_study(path: Option<&Path>) -> Result<StudyConfig> {
    match path {
        Some(p) => {
            eprintln!("Loading study configuration from {:?}...", p);
            StudyConfig::from_file(p)
        }
        None => Ok(StudyConfig::default_study()),
    }
}

fn report_failures(evaluation: &ScenarioEvaluation, strict: bool) -> Result<()> {
    if evaluation.is_complete() {
        return Ok(());
    }
    eprintln!(
        "  {} estimator runs failed (first: experiment {} / {}: {})",
        evaluation.failures.len(),
        evaluation.failures[0].experiment_id,
        evaluation.failures[0].method,
        evaluation.failures[0].message
    );
    if strict {
        evaluation.clone().into_result()?;
    }
    Ok(())
}

/// Simulate one scenario to a TSV file
fn cmd_simulate(
    config_path: Option<&Path>,
    scenario: &str,
    experiments: Option<u64>,
    output_path: &Path,
) -> Result<()> {
    let mut study = load_study(config_path)?;
    if let Some(k) = experiments {
        study.params.experiments = k;
    }
    let scenario = study.scenario(scenario)?;
    let config = study.params.config_for(scenario)?;

    eprintln!(
        "Simulating {} experiments of n={} for scenario '{}'...",
        study.params.experiments, config.n, scenario.name
    );
    let table = simulate_batch(&study.params.experiment_ids(), &config)?;

    eprintln!("Writing {} rows to {:?}...", table.len(), output_path);
    table.to_tsv(output_path)?;
    Ok(())
}

/// Evaluate estimators on a simulated table
fn cmd_evaluate(input: &Path, methods: &[String], output_path: &Path, strict: bool) -> Result<()> {
    let methods: Vec<MethodConfig> = if methods.is_empty() {
        MethodConfig::with_and_without_covariate()
    } else {
        methods
            .iter()
            .map(|m| MethodConfig::parse_name(m))
            .collect::<Result<_>>()?
    };

    eprintln!("Loading experiments from {:?}...", input);
    let table = ExperimentTable::from_tsv(input)?;
    eprintln!(
        "Loaded {} rows across {} experiments",
        table.len(),
        table.experiment_ids().len()
    );

    let evaluation = evaluate_table(&table, &methods)?;
    report_failures(&evaluation, strict)?;

    eprintln!("Writing {} results to {:?}...", evaluation.results.len(), output_path);
    evaluation.results.to_tsv(output_path)?;
    if evaluation.skipped > 0 {
        eprintln!("  {} covariate runs skipped (no covariate column)", evaluation.skipped);
    }
    Ok(())
}

/// Run a whole study
fn cmd_run(config_path: Option<&Path>, output_dir: &Path, strict: bool) -> Result<()> {
    let study = load_study(config_path)?;
    eprintln!(
        "Running study '{}' ({} scenarios x {} experiments)...",
        study.name,
        study.scenarios.len(),
        study.params.experiments
    );

    let outcomes = run_study(&study)?;
    for outcome in &outcomes {
        eprintln!();
        eprintln!("Scenario '{}':", outcome.scenario);
        report_failures(&outcome.evaluation, strict)?;
        print!("{}", format_summaries(&outcome.summaries()));
    }

    let paths = write_outputs(&outcomes, output_dir)?;
    eprintln!();
    eprintln!("Wrote {} scenarios to {:?}", paths.len(), output_dir);
    Ok(())
}

/// Summarize a result table
fn cmd_summarize(input: &Path, format: OutputFormat) -> Result<()> {
    let results = ResultTable::from_tsv(input)?;
    let summaries = summarize(&results);

    match format {
        OutputFormat::Text => print!("{}", format_summaries(&summaries)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
    }
    Ok(())
}

/// Write an example study configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let yaml = StudyConfig::default_study().to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example study to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
