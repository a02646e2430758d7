//! Hypothesis testing for fitted coefficients.


pub use wald::{test_wald, test_wald_at, CoefficientTest, DEFAULT_CONFIDENCE};
