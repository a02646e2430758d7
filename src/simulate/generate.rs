//! Synthetic experiment generation.
//!
//! Every experiment owns a generator seeded from its id, so an experiment is a
//! pure function of `(experiment_id, config)` no matter how many experiments are
//! generated alongside it or on which thread.

use crate::data::ExperimentTable;
use crate::error::{Error, Result};
use crate::simulate::config::{treatment_probability, PostBaseline, SimulationConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};
use rayon::prelude::*;
use tracing::{debug, info};

/// Simulate one experiment.
///
/// Draws happen in a fixed order: all baselines, then all covariates, then all
/// assignment uniforms, then all post-period noise.
pub fn simulate(experiment_id: u64, config: &SimulationConfig) -> Result<ExperimentTable> {
    config.validate()?;

    let n = config.n;
    let mut rng = StdRng::seed_from_u64(experiment_id);

    let baseline = Normal::new(config.pre_mean, config.std)
        .map_err(|e| Error::InvalidConfig(format!("baseline distribution: {}", e)))?;
    let pre_value: Vec<f64> = (0..n).map(|_| baseline.sample(&mut rng)).collect();

    let covariate_params = config.covariate_params()?;
    let covariate: Option<Vec<f64>> = match covariate_params {
        Some(params) => {
            let dist = Uniform::new_inclusive(params.min, params.max)
                .map_err(|e| Error::InvalidConfig(format!("covariate distribution: {}", e)))?;
            Some((0..n).map(|_| dist.sample(&mut rng)).collect())
        }
        None => None,
    };

    let bias = config.selection_bias()?;
    let is_treatment: Vec<u8> = (0..n)
        .map(|i| {
            let c = covariate.as_ref().map_or(0.0, |cov| cov[i]);
            let u: f64 = rng.random();
            u8::from(u < treatment_probability(c, bias))
        })
        .collect();

    let noise = Normal::new(0.0, config.std)
        .map_err(|e| Error::InvalidConfig(format!("noise distribution: {}", e)))?;
    let covariate_effect = covariate_params.map_or(0.0, |p| p.effect);
    let post_value: Vec<f64> = (0..n)
        .map(|i| {
            let base = match config.post_baseline {
                PostBaseline::CarryForward => pre_value[i],
                PostBaseline::PopulationMean => config.pre_mean,
            };
            let c = covariate.as_ref().map_or(0.0, |cov| cov[i]);
            base + config.true_effect * f64::from(is_treatment[i])
                + covariate_effect * c
                + noise.sample(&mut rng)
        })
        .collect();

    debug!(experiment_id, n, "simulated experiment");

    ExperimentTable::from_columns(
        experiment_id,
        pre_value,
        post_value,
        is_treatment,
        covariate,
        config.true_effect,
    )
}

/// Simulate many experiments in parallel.
///
/// The result is the concatenation of `simulate(id, config)` for each id, in
/// the order given.
pub fn simulate_batch(experiment_ids: &[u64], config: &SimulationConfig) -> Result<ExperimentTable> {
    config.validate()?;
    info!(
        experiments = experiment_ids.len(),
        n = config.n,
        has_covariate = config.has_covariate,
        has_selection_bias = config.has_selection_bias,
        "simulating experiments"
    );

    let tables = experiment_ids
        .par_iter()
        .map(|&id| simulate(id, config))
        .collect::<Result<Vec<_>>>()?;

    ExperimentTable::concat(tables)
}
