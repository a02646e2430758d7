//! The closed set of column names used by tables and model specifications.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A named numeric column.
///
/// Names are part of the persisted table format, so [`Column::name`] must stay
/// stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Baseline measurement before treatment.
    PreValue,
    /// Measurement after treatment exposure.
    PostValue,
    /// `post_value - pre_value`.
    Change,
    /// Treatment assignment indicator (0/1).
    IsTreatment,
    /// Optional observed covariate.
    Covariate,
    /// CUPED-adjusted outcome.
    AdjustedOutcome,
    /// Panel period indicator (0 = pre, 1 = post).
    Time,
    /// Panel outcome (pre or post value depending on `time`).
    Target,
    /// Panel cluster identifier (original subject row).
    SubjectId,
}

impl Column {
    /// All columns, in declaration order.
    pub const ALL: [Column; 9] = [
        Column::PreValue,
        Column::PostValue,
        Column::Change,
        Column::IsTreatment,
        Column::Covariate,
        Column::AdjustedOutcome,
        Column::Time,
        Column::Target,
        Column::SubjectId,
    ];

    /// Column name as written in tables and coefficient names.
    pub fn name(&self) -> &'static str {
        match self {
            Column::PreValue => "pre_value",
            Column::PostValue => "post_value",
            Column::Change => "change",
            Column::IsTreatment => "is_treatment",
            Column::Covariate => "covariate",
            Column::AdjustedOutcome => "adjusted_outcome",
            Column::Time => "time",
            Column::Target => "target",
            Column::SubjectId => "subject_id",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s.trim())
            .ok_or_else(|| Error::MissingColumn(s.to_string()))
    }
}
