//! Linear model fitting via OLS.

use crate::data::{Column, DesignMatrix, ModelFrame, ModelSpec};
use crate::error::{Error, Result};
use crate::model::robust::cluster_robust_covariance;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// How coefficient standard errors are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Covariance {
    /// Classical homoskedastic covariance `sigma^2 (X'X)^-1`, df = n - p.
    #[default]
    Iid,
    /// Cluster-robust sandwich grouped by the values of a column, df = G - 1.
    Cluster(Column),
}

/// Results from fitting a linear model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsFit {
    /// Coefficient names from the design matrix.
    pub coefficient_names: Vec<String>,
    /// Estimated coefficients.
    pub coefficients: Vec<f64>,
    /// Standard errors of coefficients.
    pub std_errors: Vec<f64>,
    /// Residuals.
    #[serde(skip)]
    pub residuals: Vec<f64>,
    /// Fitted values.
    #[serde(skip)]
    pub fitted: Vec<f64>,
    /// Residual standard error (sigma).
    pub sigma: f64,
    /// R-squared.
    pub r_squared: f64,
    /// Degrees of freedom used for inference.
    pub df: f64,
    /// Number of observations.
    pub n_obs: usize,
    /// Number of clusters when the covariance is clustered.
    pub n_clusters: Option<usize>,
    /// Covariance estimator used for the standard errors.
    pub covariance: Covariance,
}

impl OlsFit {
    /// Get coefficient index by name.
    pub fn coefficient_index(&self, name: &str) -> Option<usize> {
        self.coefficient_names.iter().position(|n| n == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.coefficient_index(name)
            .ok_or_else(|| Error::UnknownCoefficient {
                name: name.to_string(),
                available: self.coefficient_names.clone(),
            })
    }

    /// Coefficient estimate by name.
    pub fn estimate(&self, name: &str) -> Result<f64> {
        Ok(self.coefficients[self.require(name)?])
    }

    /// Standard error by name.
    pub fn std_error(&self, name: &str) -> Result<f64> {
        Ok(self.std_errors[self.require(name)?])
    }

    /// Number of coefficients (including intercept if present).
    pub fn n_coefficients(&self) -> usize {
        self.coefficient_names.len()
    }
}

/// Fit an OLS model of `spec` on `frame`.
///
/// Solves the least-squares problem through a Householder QR decomposition of
/// the design matrix. A rank-deficient design is reported as
/// [`Error::SingularDesign`] instead of producing non-finite estimates.
pub fn fit_ols(frame: &ModelFrame, spec: &ModelSpec, covariance: Covariance) -> Result<OlsFit> {
    let design = DesignMatrix::from_spec(frame, spec)?;
    let clusters = match covariance {
        Covariance::Iid => None,
        Covariance::Cluster(col) => Some(frame.column(col)?),
    };
    fit_design(&design, covariance, clusters)
}

/// Fit a prepared design matrix. `clusters` carries one label per row when
/// `covariance` is clustered.
fn fit_design(
    design: &DesignMatrix,
    covariance: Covariance,
    clusters: Option<&[f64]>,
) -> Result<OlsFit> {
    let x = design.matrix();
    let y = design.response();
    let n = design.n_obs();
    let p = design.n_coefficients();

    if p == 0 {
        return Err(Error::InvalidConfig(
            "Model has no coefficients".to_string(),
        ));
    }
    if n <= p {
        return Err(Error::InsufficientData(format!(
            "Model is saturated ({} observations for {} coefficients)",
            n, p
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(Error::Numerical(
            "Design or response contains non-finite values".to_string(),
        ));
    }

    let qr = x.clone().qr();
    let q = qr.q();
    let r = qr.r();
    check_rank(&r, design.coefficient_names(), n.max(p))?;

    let singular = || Error::SingularDesign("triangular solve failed".to_string());
    let beta = r
        .solve_upper_triangular(&(q.transpose() * y))
        .ok_or_else(singular)?;
    let r_inv = r
        .solve_upper_triangular(&DMatrix::identity(p, p))
        .ok_or_else(singular)?;
    // (X'X)^-1 = R^-1 R^-T
    let xtx_inv = &r_inv * r_inv.transpose();

    let fitted = x * &beta;
    let residuals: DVector<f64> = y - &fitted;
    let rss = residuals.norm_squared();
    let df_residual = (n - p) as f64;
    let sigma = (rss / df_residual).sqrt();

    let (cov, df, n_clusters) = match clusters {
        None => (&xtx_inv * sigma.powi(2), df_residual, None),
        Some(ids) => {
            let (cov, g) = cluster_robust_covariance(x, &residuals, &xtx_inv, ids)?;
            (cov, (g - 1) as f64, Some(g))
        }
    };

    let std_errors: Vec<f64> = (0..p).map(|j| cov[(j, j)].max(0.0).sqrt()).collect();
    if std_errors.iter().any(|se| !se.is_finite()) {
        return Err(Error::Numerical(
            "Non-finite standard error".to_string(),
        ));
    }

    let y_mean = y.mean();
    let tss: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };

    Ok(OlsFit {
        coefficient_names: design.coefficient_names().to_vec(),
        coefficients: beta.iter().copied().collect(),
        std_errors,
        residuals: residuals.iter().copied().collect(),
        fitted: fitted.iter().copied().collect(),
        sigma,
        r_squared,
        df,
        n_obs: n,
        n_clusters,
        covariance,
    })
}

/// Reject designs whose R factor has a numerically zero pivot.
fn check_rank(r: &DMatrix<f64>, names: &[String], scale: usize) -> Result<()> {
    let diag: Vec<f64> = r.diagonal().iter().map(|v| v.abs()).collect();
    let max_d = diag.iter().copied().fold(0.0_f64, f64::max);
    let tol = max_d * scale as f64 * f64::EPSILON;

    match diag.iter().position(|&d| d <= tol) {
        Some(j) => Err(Error::SingularDesign(format!(
            "coefficient '{}' is collinear with earlier columns",
            names[j]
        ))),
        None => Ok(()),
    }
}
