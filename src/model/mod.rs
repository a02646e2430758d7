//! Regression models used by the estimators.

pub mod lm;
pub mod robust;

pub use lm::{fit_ols, Covariance, OlsFit};
pub use robust::cluster_robust_covariance;
