//! Named numeric columns handed to the regression core.

use crate::data::Column;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// A set of equally long numeric columns keyed by [`Column`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelFrame {
    n_rows: usize,
    columns: BTreeMap<Column, Vec<f64>>,
}

impl ModelFrame {
    /// Create an empty frame with a fixed row count.
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: BTreeMap::new(),
        }
    }

    /// Add (or replace) a column, consuming the frame.
    pub fn with_column(mut self, column: Column, values: Vec<f64>) -> Result<Self> {
        self.insert(column, values)?;
        Ok(self)
    }

    /// Add (or replace) a column.
    pub fn insert(&mut self, column: Column, values: Vec<f64>) -> Result<()> {
        if values.len() != self.n_rows {
            return Err(Error::DimensionMismatch {
                expected: self.n_rows,
                actual: values.len(),
            });
        }
        self.columns.insert(column, values);
        Ok(())
    }

    /// Get a column's values.
    pub fn column(&self, column: Column) -> Result<&[f64]> {
        self.columns
            .get(&column)
            .map(|v| v.as_slice())
            .ok_or_else(|| Error::MissingColumn(column.name().to_string()))
    }

    /// Check whether a column is present.
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains_key(&column)
    }

    /// Columns present in the frame.
    pub fn column_names(&self) -> Vec<Column> {
        self.columns.keys().copied().collect()
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Arithmetic mean of a column.
    pub fn mean(&self, column: Column) -> Result<f64> {
        let values = self.column(column)?;
        if values.is_empty() {
            return Err(Error::InsufficientData(format!(
                "cannot take the mean of empty column '{}'",
                column
            )));
        }
        Ok(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let frame = ModelFrame::new(3)
            .with_column(Column::PostValue, vec![1.0, 2.0, 3.0])
            .unwrap();
        assert_eq!(frame.column(Column::PostValue).unwrap(), &[1.0, 2.0, 3.0]);
        assert!(frame.has_column(Column::PostValue));
        assert!(!frame.has_column(Column::Covariate));
        assert_eq!(frame.mean(Column::PostValue).unwrap(), 2.0);
    }

    #[test]
    fn test_length_mismatch() {
        let result = ModelFrame::new(3).with_column(Column::PreValue, vec![1.0]);
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_missing_column() {
        let frame = ModelFrame::new(2);
        assert!(matches!(
            frame.column(Column::Covariate),
            Err(Error::MissingColumn(name)) if name == "covariate"
        ));
    }
}
