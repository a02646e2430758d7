//! Structured model specification.
//!
//! A [`ModelSpec`] is built from typed terms rather than parsed from a formula
//! string, so an unknown column cannot be named at all and a column missing
//! from a particular [`ModelFrame`](crate::data::ModelFrame) is caught before
//! any fitting happens.

use crate::data::Column;
use serde::{Deserialize, Serialize};

/// A term in a model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
    /// Main effect of a column.
    Main(Column),
    /// Pairwise interaction (elementwise product of two columns).
    Interaction(Column, Column),
}

impl Term {
    /// Get the columns involved in this term.
    pub fn columns(&self) -> Vec<Column> {
        match self {
            Term::Main(c) => vec![*c],
            Term::Interaction(a, b) => vec![*a, *b],
        }
    }

    /// Coefficient name this term produces in a fitted model.
    pub fn coefficient_name(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Main(c) => write!(f, "{}", c),
            Term::Interaction(a, b) => write!(f, "{}:{}", a, b),
        }
    }
}

/// A linear model specification: `response ~ [1 +] terms`.
///
/// ```
/// use treatment_bench::data::{Column, ModelSpec};
/// let spec = ModelSpec::new(Column::Target).crossed(Column::Time, Column::IsTreatment);
/// assert_eq!(spec.to_string(), "target ~ time + is_treatment + time:is_treatment");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Response column.
    pub response: Column,
    /// Whether to include an intercept.
    pub intercept: bool,
    /// Terms (excluding intercept).
    pub terms: Vec<Term>,
}

impl ModelSpec {
    /// Create a specification with an intercept and no terms.
    pub fn new(response: Column) -> Self {
        Self {
            response,
            intercept: true,
            terms: Vec::new(),
        }
    }

    /// Drop the intercept.
    pub fn without_intercept(mut self) -> Self {
        self.intercept = false;
        self
    }

    /// Add a main effect. Duplicates are ignored.
    pub fn term(mut self, column: Column) -> Self {
        self.push(Term::Main(column));
        self
    }

    /// Add a main effect only when `include` is true.
    pub fn term_if(self, include: bool, column: Column) -> Self {
        if include {
            self.term(column)
        } else {
            self
        }
    }

    /// Add an interaction term only (`a:b`).
    pub fn interaction(mut self, a: Column, b: Column) -> Self {
        self.push(Term::Interaction(a, b));
        self
    }

    /// Add both main effects and their interaction (`a * b`).
    pub fn crossed(self, a: Column, b: Column) -> Self {
        self.term(a).term(b).interaction(a, b)
    }

    fn push(&mut self, term: Term) {
        if !self.terms.contains(&term) {
            self.terms.push(term);
        }
    }

    /// All columns referenced by the model, response included.
    pub fn columns(&self) -> Vec<Column> {
        let mut cols: Vec<Column> = std::iter::once(self.response)
            .chain(self.terms.iter().flat_map(|t| t.columns()))
            .collect();
        cols.sort();
        cols.dedup();
        cols
    }

    /// Check if a column is used as a predictor.
    pub fn uses_column(&self, column: Column) -> bool {
        self.terms.iter().any(|t| t.columns().contains(&column))
    }

    /// Number of coefficients the design matrix will have.
    pub fn n_coefficients(&self) -> usize {
        self.terms.len() + usize::from(self.intercept)
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ~ ", self.response)?;
        let mut parts: Vec<String> = Vec::new();
        if !self.intercept {
            parts.push("0".to_string());
        } else if self.terms.is_empty() {
            parts.push("1".to_string());
        }
        parts.extend(self.terms.iter().map(|t| t.to_string()));
        write!(f, "{}", parts.join(" + "))
    }
}
