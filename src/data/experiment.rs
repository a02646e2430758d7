//! Tabular storage for simulated experiments.

use crate::data::{Column, ModelFrame};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Header of a persisted experiment table, in column order.
const HEADER: [&str; 6] = [
    "experiment_id",
    "pre_value",
    "post_value",
    "change",
    "is_treatment",
    "true_effect",
];

/// One synthetic subject in one experiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRow {
    /// Experiment (and seed) identifier.
    pub experiment_id: u64,
    /// Baseline measurement.
    pub pre_value: f64,
    /// Post-treatment measurement.
    pub post_value: f64,
    /// `post_value - pre_value`.
    pub change: f64,
    /// Treatment indicator (0 or 1).
    pub is_treatment: u8,
    /// Observed covariate, when the scenario has one.
    #[serde(default)]
    pub covariate: Option<f64>,
    /// Ground-truth additive treatment effect.
    pub true_effect: f64,
}

/// Column-oriented table of experiment rows.
///
/// Either every row carries a covariate or none does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentTable {
    experiment_id: Vec<u64>,
    pre_value: Vec<f64>,
    post_value: Vec<f64>,
    change: Vec<f64>,
    is_treatment: Vec<u8>,
    covariate: Option<Vec<f64>>,
    true_effect: Vec<f64>,
}

impl ExperimentTable {
    /// Create a table for a single experiment from its columns.
    ///
    /// `change` is derived from `post_value - pre_value`.
    pub fn from_columns(
        experiment_id: u64,
        pre_value: Vec<f64>,
        post_value: Vec<f64>,
        is_treatment: Vec<u8>,
        covariate: Option<Vec<f64>>,
        true_effect: f64,
    ) -> Result<Self> {
        let n = pre_value.len();
        for len in [post_value.len(), is_treatment.len()]
            .into_iter()
            .chain(covariate.as_ref().map(Vec::len))
        {
            if len != n {
                return Err(Error::DimensionMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }
        if let Some(bad) = is_treatment.iter().find(|&&t| t > 1) {
            return Err(Error::InvalidConfig(format!(
                "is_treatment must be 0 or 1, got {}",
                bad
            )));
        }

        let change = post_value
            .iter()
            .zip(&pre_value)
            .map(|(post, pre)| post - pre)
            .collect();

        Ok(Self {
            experiment_id: vec![experiment_id; n],
            pre_value,
            post_value,
            change,
            is_treatment,
            covariate,
            true_effect: vec![true_effect; n],
        })
    }

    /// Build a table from rows.
    pub fn from_rows(rows: &[ExperimentRow]) -> Result<Self> {
        let has_covariate = rows.first().is_some_and(|r| r.covariate.is_some());
        let mut table = Self::empty(has_covariate);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    fn empty(has_covariate: bool) -> Self {
        Self {
            covariate: has_covariate.then(Vec::new),
            ..Default::default()
        }
    }

    fn push_row(&mut self, row: &ExperimentRow) -> Result<()> {
        if row.is_treatment > 1 {
            return Err(Error::InvalidConfig(format!(
                "is_treatment must be 0 or 1, got {} in experiment {}",
                row.is_treatment, row.experiment_id
            )));
        }
        match (&mut self.covariate, row.covariate) {
            (Some(cov), Some(value)) => cov.push(value),
            (None, None) => {}
            _ => {
                return Err(Error::InvalidConfig(format!(
                    "covariate must be present on every row or on none (experiment {})",
                    row.experiment_id
                )))
            }
        }
        self.experiment_id.push(row.experiment_id);
        self.pre_value.push(row.pre_value);
        self.post_value.push(row.post_value);
        self.change.push(row.change);
        self.is_treatment.push(row.is_treatment);
        self.true_effect.push(row.true_effect);
        Ok(())
    }

    /// Concatenate tables in order. All tables must agree on covariate presence.
    pub fn concat(tables: Vec<ExperimentTable>) -> Result<Self> {
        let has_covariate = tables.first().is_some_and(|t| t.has_covariate());
        if tables.iter().any(|t| t.has_covariate() != has_covariate) {
            return Err(Error::InvalidConfig(
                "cannot concatenate tables with and without a covariate column".to_string(),
            ));
        }

        let mut out = Self::empty(has_covariate);
        for table in tables {
            out.experiment_id.extend(table.experiment_id);
            out.pre_value.extend(table.pre_value);
            out.post_value.extend(table.post_value);
            out.change.extend(table.change);
            out.is_treatment.extend(table.is_treatment);
            out.true_effect.extend(table.true_effect);
            if let (Some(dst), Some(src)) = (out.covariate.as_mut(), table.covariate) {
                dst.extend(src);
            }
        }
        Ok(out)
    }

    /// Split the table into one table per experiment id.
    pub fn group_by_experiment(&self) -> BTreeMap<u64, ExperimentTable> {
        let mut groups: BTreeMap<u64, ExperimentTable> = BTreeMap::new();
        for row in self.rows() {
            let group = groups
                .entry(row.experiment_id)
                .or_insert_with(|| Self::empty(self.has_covariate()));
            // Rows come from a consistent table, so covariate presence always matches.
            group.experiment_id.push(row.experiment_id);
            group.pre_value.push(row.pre_value);
            group.post_value.push(row.post_value);
            group.change.push(row.change);
            group.is_treatment.push(row.is_treatment);
            group.true_effect.push(row.true_effect);
            if let (Some(cov), Some(value)) = (group.covariate.as_mut(), row.covariate) {
                cov.push(value);
            }
        }
        groups
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = ExperimentRow> + '_ {
        (0..self.len()).map(move |i| self.row(i))
    }

    /// Get a single row.
    pub fn row(&self, i: usize) -> ExperimentRow {
        ExperimentRow {
            experiment_id: self.experiment_id[i],
            pre_value: self.pre_value[i],
            post_value: self.post_value[i],
            change: self.change[i],
            is_treatment: self.is_treatment[i],
            covariate: self.covariate.as_ref().map(|c| c[i]),
            true_effect: self.true_effect[i],
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.experiment_id.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.experiment_id.is_empty()
    }

    /// Whether the table carries a covariate column.
    pub fn has_covariate(&self) -> bool {
        self.covariate.is_some()
    }

    /// Distinct experiment ids, ascending.
    pub fn experiment_ids(&self) -> Vec<u64> {
        let mut ids = self.experiment_id.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// The ground-truth effect of the first row (constant within an experiment).
    pub fn true_effect(&self) -> Option<f64> {
        self.true_effect.first().copied()
    }

    pub fn pre_value(&self) -> &[f64] {
        &self.pre_value
    }

    pub fn post_value(&self) -> &[f64] {
        &self.post_value
    }

    pub fn change(&self) -> &[f64] {
        &self.change
    }

    pub fn is_treatment(&self) -> &[u8] {
        &self.is_treatment
    }

    pub fn covariate(&self) -> Option<&[f64]> {
        self.covariate.as_deref()
    }

    /// Numeric view of the table for model fitting.
    pub fn to_frame(&self) -> Result<ModelFrame> {
        let mut frame = ModelFrame::new(self.len())
            .with_column(Column::PreValue, self.pre_value.clone())?
            .with_column(Column::PostValue, self.post_value.clone())?
            .with_column(Column::Change, self.change.clone())?
            .with_column(
                Column::IsTreatment,
                self.is_treatment.iter().map(|&t| f64::from(t)).collect(),
            )?;
        if let Some(cov) = &self.covariate {
            frame.insert(Column::Covariate, cov.clone())?;
        }
        Ok(frame)
    }

    /// Write the table as tab-separated values.
    ///
    /// The `covariate` column is written only when the table has one.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);

        let mut header: Vec<&str> = HEADER.to_vec();
        if self.has_covariate() {
            header.insert(5, Column::Covariate.name());
        }
        wtr.write_record(&header)?;

        for row in self.rows() {
            let mut record = vec![
                row.experiment_id.to_string(),
                row.pre_value.to_string(),
                row.post_value.to_string(),
                row.change.to_string(),
                row.is_treatment.to_string(),
            ];
            if let Some(cov) = row.covariate {
                record.push(cov.to_string());
            }
            record.push(row.true_effect.to_string());
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Read a table written by [`write_tsv`](Self::write_tsv).
    pub fn read_tsv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for required in HEADER {
            if !headers.iter().any(|h| h == required) {
                return Err(Error::MissingColumn(required.to_string()));
            }
        }
        let has_covariate = headers.iter().any(|h| h == Column::Covariate.name());

        let mut table = Self::empty(has_covariate);
        for record in rdr.deserialize::<ExperimentRow>() {
            table.push_row(&record?)?;
        }
        Ok(table)
    }

    /// Write the table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_tsv(BufWriter::new(file))
    }

    /// Load a table from a TSV file.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_tsv(BufReader::new(file))
    }
}
