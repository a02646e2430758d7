//! Design matrix construction from a model frame and specification.

use crate::data::{Column, ModelFrame, ModelSpec, Term};
use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// Name of the intercept coefficient.
pub const INTERCEPT: &str = "(Intercept)";

/// A design matrix for linear modeling.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    /// The design matrix (observations × coefficients).
    matrix: DMatrix<f64>,
    /// Names of the coefficients (columns).
    coefficient_names: Vec<String>,
    /// Response vector.
    response: DVector<f64>,
}

impl DesignMatrix {
    /// Build a design matrix from a frame and a model specification.
    ///
    /// Every column the model references must be present in the frame.
    pub fn from_spec(frame: &ModelFrame, spec: &ModelSpec) -> Result<Self> {
        for col in spec.columns() {
            if !frame.has_column(col) {
                return Err(Error::MissingColumn(col.name().to_string()));
            }
        }

        let n_obs = frame.n_rows();
        let mut coefficient_names = Vec::with_capacity(spec.n_coefficients());
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(spec.n_coefficients());

        if spec.intercept {
            coefficient_names.push(INTERCEPT.to_string());
            columns.push(vec![1.0; n_obs]);
        }

        for term in &spec.terms {
            coefficient_names.push(term.coefficient_name());
            columns.push(Self::term_column(frame, term)?);
        }

        let n_coef = columns.len();
        let matrix = DMatrix::from_fn(n_obs, n_coef, |i, j| columns[j][i]);
        let response = DVector::from_column_slice(frame.column(spec.response)?);

        Ok(Self {
            matrix,
            coefficient_names,
            response,
        })
    }

    fn term_column(frame: &ModelFrame, term: &Term) -> Result<Vec<f64>> {
        match term {
            Term::Main(c) => Ok(frame.column(*c)?.to_vec()),
            Term::Interaction(a, b) => {
                let col_a = frame.column(*a)?;
                let col_b = frame.column(*b)?;
                Ok(col_a.iter().zip(col_b).map(|(x, y)| x * y).collect())
            }
        }
    }

    /// Get the design matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Get the response vector.
    pub fn response(&self) -> &DVector<f64> {
        &self.response
    }

    /// Get coefficient names.
    pub fn coefficient_names(&self) -> &[String] {
        &self.coefficient_names
    }

    /// Number of observations (rows).
    pub fn n_obs(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of coefficients (columns).
    pub fn n_coefficients(&self) -> usize {
        self.matrix.ncols()
    }

    /// Get the index of a coefficient by name.
    pub fn coefficient_index(&self, name: &str) -> Option<usize> {
        self.coefficient_names.iter().position(|n| n == name)
    }

    /// Check if the matrix has an intercept.
    pub fn has_intercept(&self) -> bool {
        self.coefficient_names.first().map(String::as_str) == Some(INTERCEPT)
    }

    /// Column index of the coefficient for a given column's main effect.
    pub fn main_effect_index(&self, column: Column) -> Option<usize> {
        self.coefficient_index(column.name())
    }
}
