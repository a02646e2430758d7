//! Estimator outputs and evaluation result tables.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Point estimate and inference for a treatment effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreatmentEffect {
    /// Two-sided p-value for a zero effect.
    pub p_value: f64,
    /// Estimated effect.
    pub estimate: f64,
    /// Lower confidence bound.
    pub ci_lower: f64,
    /// Upper confidence bound.
    pub ci_upper: f64,
}

impl TreatmentEffect {
    /// Whether the confidence interval contains `value`.
    pub fn covers(&self, value: f64) -> bool {
        self.ci_lower <= value && value <= self.ci_upper
    }

    /// Width of the confidence interval.
    pub fn ci_width(&self) -> f64 {
        self.ci_upper - self.ci_lower
    }

    /// Check if significant at a custom threshold.
    pub fn is_significant_at(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// One estimator applied to one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub experiment_id: u64,
    /// Estimator name, `_covariate`-suffixed when covariate-adjusted.
    pub method: String,
    pub p_value: f64,
    pub estimate: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// Ground truth copied from the experiment.
    pub true_effect: f64,
}

impl EvaluationRow {
    /// Create a row from an estimator output.
    pub fn new(
        experiment_id: u64,
        method: impl Into<String>,
        effect: TreatmentEffect,
        true_effect: f64,
    ) -> Self {
        Self {
            experiment_id,
            method: method.into(),
            p_value: effect.p_value,
            estimate: effect.estimate,
            ci_lower: effect.ci_lower,
            ci_upper: effect.ci_upper,
            true_effect,
        }
    }

    /// The estimator output carried by this row.
    pub fn effect(&self) -> TreatmentEffect {
        TreatmentEffect {
            p_value: self.p_value,
            estimate: self.estimate,
            ci_lower: self.ci_lower,
            ci_upper: self.ci_upper,
        }
    }

    /// `estimate - true_effect`.
    pub fn error(&self) -> f64 {
        self.estimate - self.true_effect
    }
}

/// Flat collection of evaluation rows. Row order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    rows: Vec<EvaluationRow>,
}

impl ResultTable {
    /// Create a table from rows.
    pub fn new(rows: Vec<EvaluationRow>) -> Self {
        Self { rows }
    }

    /// Concatenate tables.
    pub fn concat(tables: impl IntoIterator<Item = ResultTable>) -> Self {
        Self {
            rows: tables.into_iter().flat_map(|t| t.rows).collect(),
        }
    }

    pub fn push(&mut self, row: EvaluationRow) {
        self.rows.push(row);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &EvaluationRow> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[EvaluationRow] {
        &self.rows
    }

    /// Distinct method names, sorted.
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.rows.iter().map(|r| r.method.clone()).collect();
        methods.sort();
        methods.dedup();
        methods
    }

    /// Rows produced by one method.
    pub fn for_method<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a EvaluationRow> {
        self.rows.iter().filter(move |r| r.method == method)
    }

    /// Sort rows by experiment id, then method name.
    pub fn sort(&mut self) {
        self.rows.sort_by(|a, b| {
            a.experiment_id
                .cmp(&b.experiment_id)
                .then_with(|| a.method.cmp(&b.method))
        });
    }

    /// Write rows as tab-separated values.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Read rows written by [`write_tsv`](Self::write_tsv).
    pub fn read_tsv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(reader);
        let rows = rdr
            .deserialize::<EvaluationRow>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    /// Write results to TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_tsv(BufWriter::new(file))
    }

    /// Load results from a TSV file.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_tsv(BufReader::new(file))
    }
}

impl FromIterator<EvaluationRow> for ResultTable {
    fn from_iter<I: IntoIterator<Item = EvaluationRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ResultTable {
    type Item = EvaluationRow;
    type IntoIter = std::vec::IntoIter<EvaluationRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
