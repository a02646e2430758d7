//! Study configuration: shared parameters plus a list of scenarios.

use crate::error::{Error, Result};
use crate::estimate::{Estimator, MethodConfig};
use crate::simulate::{PostBaseline, SimulationConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Numeric parameters shared by every scenario of a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Experiments per scenario; ids run from 0 to `experiments - 1`.
    pub experiments: u64,
    /// Subjects per experiment.
    pub n: usize,
    pub true_effect: f64,
    #[serde(alias = "target_pre_experiment_mean")]
    pub pre_mean: f64,
    #[serde(alias = "target_std")]
    pub std: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariate_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariate_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariate_effect: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariate_selection_bias: Option<f64>,
    #[serde(default)]
    pub post_baseline: PostBaseline,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            experiments: 1000,
            n: 1000,
            true_effect: 1.0,
            pre_mean: 10.0,
            std: 2.0,
            covariate_min: Some(0.0),
            covariate_max: Some(1.0),
            covariate_effect: Some(2.0),
            covariate_selection_bias: Some(0.3),
            post_baseline: PostBaseline::CarryForward,
        }
    }
}

impl SimulationParams {
    /// Simulation config for one scenario.
    ///
    /// Covariate parameters are only required by scenarios that use them.
    pub fn config_for(&self, scenario: &ScenarioConfig) -> Result<SimulationConfig> {
        let config = SimulationConfig {
            n: self.n,
            true_effect: self.true_effect,
            pre_mean: self.pre_mean,
            std: self.std,
            covariate_min: self.covariate_min,
            covariate_max: self.covariate_max,
            covariate_effect: self.covariate_effect,
            covariate_selection_bias: self.covariate_selection_bias,
            has_covariate: scenario.has_covariate,
            has_selection_bias: scenario.has_selection_bias,
            post_baseline: self.post_baseline,
        };
        config.validate()?;
        Ok(config)
    }

    /// Experiment ids simulated for every scenario.
    pub fn experiment_ids(&self) -> Vec<u64> {
        (0..self.experiments).collect()
    }
}

/// One simulated design and the methods evaluated on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub has_covariate: bool,
    #[serde(default)]
    pub has_selection_bias: bool,
    pub methods: Vec<MethodConfig>,
}

impl ScenarioConfig {
    /// Baseline and outcome only.
    pub fn no_covariate() -> Self {
        Self {
            name: "no_covariate".to_string(),
            has_covariate: false,
            has_selection_bias: false,
            methods: MethodConfig::unadjusted(),
        }
    }

    /// An additive covariate independent of assignment.
    pub fn covariate() -> Self {
        Self {
            name: "covariate".to_string(),
            has_covariate: true,
            has_selection_bias: false,
            methods: MethodConfig::with_and_without_covariate(),
        }
    }

    /// A covariate that also shifts the probability of treatment.
    pub fn selection_bias() -> Self {
        Self {
            name: "selection_bias".to_string(),
            has_covariate: true,
            has_selection_bias: true,
            methods: MethodConfig::with_and_without_covariate(),
        }
    }

    /// Restrict the scenario to a subset of estimators.
    pub fn with_estimators(mut self, estimators: &[Estimator]) -> Self {
        self.methods.retain(|m| estimators.contains(&m.estimator));
        self
    }
}

/// A full study: shared parameters and the scenarios to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub params: SimulationParams,
    pub scenarios: Vec<ScenarioConfig>,
}

impl StudyConfig {
    /// The three standard scenarios with default parameters.
    pub fn default_study() -> Self {
        Self {
            name: "treatment_effect_study".to_string(),
            description: Some(
                "Estimator accuracy without a covariate, with an additive covariate, and under covariate-driven selection".to_string(),
            ),
            params: SimulationParams::default(),
            scenarios: vec![
                ScenarioConfig::no_covariate(),
                ScenarioConfig::covariate(),
                ScenarioConfig::selection_bias(),
            ],
        }
    }

    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Look up a scenario by name.
    pub fn scenario(&self, name: &str) -> Result<&ScenarioConfig> {
        self.scenarios.iter().find(|s| s.name == name).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "Unknown scenario '{}'. Available: {:?}",
                name,
                self.scenarios.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
            ))
        })
    }

    /// Check every scenario before any simulation runs.
    pub fn validate(&self) -> Result<()> {
        if self.params.experiments == 0 {
            return Err(Error::InvalidConfig(
                "experiments must be positive".to_string(),
            ));
        }
        let mut names = BTreeSet::new();
        for scenario in &self.scenarios {
            if !is_valid_scenario_name(&scenario.name) {
                return Err(Error::InvalidConfig(format!(
                    "Scenario name '{}' must be non-empty, use only letters, digits, '_', '-' or '.', and not start with '.'",
                    scenario.name
                )));
            }
            if !names.insert(scenario.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "Duplicate scenario name '{}'",
                    scenario.name
                )));
            }
            if scenario.methods.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "Scenario '{}' has no methods",
                    scenario.name
                )));
            }
            self.params.config_for(scenario)?;
        }
        Ok(())
    }
}

/// Scenario names become output file stems, so they must stay inside the output directory.
pub(crate) fn is_valid_scenario_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
