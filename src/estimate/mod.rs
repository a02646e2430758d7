//! Treatment-effect estimators.
//!
//! Every estimator maps one experiment to a [`TreatmentEffect`] for the
//! treatment indicator and can optionally adjust for the observed covariate.
//! Requesting covariate adjustment on data without a covariate is an error.

mod cuped;
mod panel;
mod regression;

pub use cuped::cuped;
pub use panel::{diff_in_diff, diff_in_diff_with, interaction_name, panel_spec, reshape_panel};
pub use regression::{autoregression, change_score, t_test};

use crate::data::{ExperimentTable, TreatmentEffect};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The estimator menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    TTest,
    ChangeScore,
    Autoregression,
    Cuped,
    DiffInDiff,
}

impl Estimator {
    pub const ALL: [Estimator; 5] = [
        Estimator::TTest,
        Estimator::ChangeScore,
        Estimator::Autoregression,
        Estimator::Cuped,
        Estimator::DiffInDiff,
    ];

    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Estimator::TTest => "t_test",
            Estimator::ChangeScore => "change_score",
            Estimator::Autoregression => "autoregression",
            Estimator::Cuped => "cuped",
            Estimator::DiffInDiff => "diff_in_diff",
        }
    }

    /// Apply the estimator to one experiment.
    pub fn estimate(&self, table: &ExperimentTable, use_covariate: bool) -> Result<TreatmentEffect> {
        match self {
            Estimator::TTest => t_test(table, use_covariate),
            Estimator::ChangeScore => change_score(table, use_covariate),
            Estimator::Autoregression => autoregression(table, use_covariate),
            Estimator::Cuped => cuped(table, use_covariate),
            Estimator::DiffInDiff => diff_in_diff(table, use_covariate),
        }
    }
}

impl std::fmt::Display for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Estimator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Estimator::ALL
            .iter()
            .copied()
            .find(|e| e.name() == s)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "Unknown estimator '{}'. Valid options: {:?}",
                    s,
                    Estimator::ALL.map(|e| e.name())
                ))
            })
    }
}

/// An estimator paired with the covariate-adjustment switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodConfig {
    pub estimator: Estimator,
    #[serde(default)]
    pub use_covariate: bool,
}

impl MethodConfig {
    pub fn new(estimator: Estimator, use_covariate: bool) -> Self {
        Self {
            estimator,
            use_covariate,
        }
    }

    /// Method name as reported in result tables, `_covariate`-suffixed when adjusted.
    pub fn name(&self) -> String {
        if self.use_covariate {
            format!("{}_covariate", self.estimator.name())
        } else {
            self.estimator.name().to_string()
        }
    }

    /// Run the configured estimator.
    pub fn run(&self, table: &ExperimentTable) -> Result<TreatmentEffect> {
        self.estimator.estimate(table, self.use_covariate)
    }

    /// Parse a reported method name such as `cuped` or `cuped_covariate`.
    pub fn parse_name(name: &str) -> Result<Self> {
        let name = name.trim();
        match name.strip_suffix("_covariate") {
            Some(base) => Ok(Self::new(base.parse()?, true)),
            None => Ok(Self::new(name.parse()?, false)),
        }
    }

    /// Every estimator, unadjusted.
    pub fn unadjusted() -> Vec<MethodConfig> {
        Estimator::ALL.iter().map(|&e| Self::new(e, false)).collect()
    }

    /// Every estimator, each unadjusted and covariate-adjusted.
    pub fn with_and_without_covariate() -> Vec<MethodConfig> {
        Estimator::ALL
            .iter()
            .flat_map(|&e| [Self::new(e, false), Self::new(e, true)])
            .collect()
    }
}
